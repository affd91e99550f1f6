//! Lattice properties of the interval domain.

use test_log::test;

use range_rs::apint::ApInt;
use range_rs::predicate::Predicate;
use range_rs::range::IntRange;

fn samples() -> Vec<IntRange> {
    vec![
        IntRange::empty(8),
        IntRange::full(8),
        IntRange::constant(8, 0),
        IntRange::constant(8, 255),
        IntRange::inclusive(8, 0, 9),
        IntRange::inclusive(8, 10, 255),
        IntRange::inclusive(8, 100, 200),
        IntRange::inclusive(8, 250, 5),
        IntRange::inclusive(8, 127, 128),
    ]
}

#[test]
fn test_union_is_an_idempotent_upper_bound() {
    for a in samples() {
        for b in samples() {
            let ab = a.union(&b);
            assert_eq!(a.union(&ab), ab, "{} | ({} | {})", a, a, b);
            assert!(ab.contains_range(&a), "{} not in {}", a, ab);
            assert!(ab.contains_range(&b), "{} not in {}", b, ab);
        }
    }
}

#[test]
fn test_union_in_place_reports_growth() {
    for a in samples() {
        for b in samples() {
            let mut c = a.clone();
            let grew = c.union_in_place(&b);
            assert_eq!(c, a.union(&b));
            assert_eq!(grew, c != a);
        }
    }
}

#[test]
fn test_narrow_union_into_wider_keeps_members() {
    let wide = IntRange::inclusive(16, 1000, 2000);
    let narrow = IntRange::inclusive(8, 250, 255);
    let mut joined = wide.clone();
    joined.union_in_place(&narrow);
    assert_eq!(joined.width(), 16);
    for v in 250..=255 {
        assert!(joined.contains(&ApInt::from_u64(16, v)));
    }
    assert!(joined.contains_range(&wide));

    let signed = IntRange::inclusive(8, 0xF0, 0x10).sign_extend(16);
    for v in [0xFFF0, 0xFFFF, 0, 0x10] {
        assert!(signed.contains(&ApInt::from_u64(16, v)));
    }
}

#[test]
fn test_icmp_regions_partition() {
    let x = IntRange::full(8);
    let ten = IntRange::constant(8, 10);
    let lt = x.intersect(&IntRange::allowed_icmp_region(Predicate::Ult, &ten));
    let ge = x.intersect(&IntRange::allowed_icmp_region(Predicate::Ult.inverse(), &ten));
    assert_eq!(lt, IntRange::inclusive(8, 0, 9));
    assert_eq!(ge, IntRange::inclusive(8, 10, 255));
    assert!(lt.icmp(Predicate::Ult, &ten));
    assert!(ge.icmp(Predicate::Uge, &ten));
    assert!(!x.icmp(Predicate::Ult, &ten));
}
