use portscan_rs::ports::{resolve, ParseError};

#[test]
fn resolves_documented_examples() {
    assert_eq!(resolve("80").expect("parse ok"), vec![80]);
    assert_eq!(resolve("20-22").expect("parse ok"), vec![20, 21, 22]);
    assert_eq!(resolve("22,80,443").expect("parse ok"), vec![22, 80, 443]);
    assert_eq!(
        resolve("22,100-102").expect("parse ok"),
        vec![22, 100, 101, 102]
    );
    assert_eq!(resolve("0-5").expect("parse ok"), vec![1, 2, 3, 4, 5]);
}

#[test]
fn rejects_documented_examples() {
    assert!(matches!(resolve("0"), Err(ParseError::InvalidPort { .. })));
    assert!(matches!(resolve("70000"), Err(ParseError::InvalidPort { .. })));
    assert!(matches!(
        resolve("10-5"),
        Err(ParseError::InvalidRangeOrder { .. })
    ));
    assert!(matches!(
        resolve("a-5"),
        Err(ParseError::InvalidRangeBound { .. })
    ));
}

#[test]
fn error_names_the_offending_token() {
    let err = resolve("22, 80 ,abc,443").unwrap_err();
    assert_eq!(
        err,
        ParseError::InvalidPort {
            token: "abc".into()
        }
    );
    assert!(err.to_string().contains("abc"));
}

#[test]
fn resolution_is_deterministic() {
    let spec = "443, 1-3, 8080, 2-4";
    let first = resolve(spec).expect("parse ok");
    for _ in 0..5 {
        assert_eq!(resolve(spec).expect("parse ok"), first);
    }
    assert_eq!(first, vec![443, 1, 2, 3, 8080, 2, 3, 4]);
}

#[test]
fn full_range_resolves() {
    let ports = resolve("1-65535").expect("parse ok");
    assert_eq!(ports.len(), 65535);
    assert_eq!(ports.first(), Some(&1));
    assert_eq!(ports.last(), Some(&65535));
}
