use payment_settlement::domain::reference::ReferenceKind;
use std::collections::HashSet;

#[test]
fn test_references_are_unique_and_well_formed() {
    for kind in [ReferenceKind::Payment, ReferenceKind::Refund, ReferenceKind::Invoice] {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let reference = kind.generate();
            assert!(kind.matches(&reference), "malformed reference {reference}");
            assert_eq!(reference.len(), kind.prefix().len() + kind.hex_len());
            assert!(seen.insert(reference), "duplicate {kind:?} reference");
        }
    }
}

#[test]
fn test_references_do_not_cross_kinds() {
    let payment = ReferenceKind::Payment.generate();
    assert!(!ReferenceKind::Refund.matches(&payment));
    assert!(!ReferenceKind::Invoice.matches(&payment));
    assert!(!ReferenceKind::Payment.matches(&payment.to_lowercase()));
}
