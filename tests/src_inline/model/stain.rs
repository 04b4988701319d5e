use super::*;

#[test]
fn test_relation_parse_aliases() {
    assert_eq!(">".parse::<Relation>().unwrap(), Relation::GreaterThan);
    assert_eq!("greater_than".parse::<Relation>().unwrap(), Relation::GreaterThan);
    assert_eq!("<".parse::<Relation>().unwrap(), Relation::LessThan);
    assert_eq!("Less".parse::<Relation>().unwrap(), Relation::LessThan);
    assert!("=".parse::<Relation>().is_err());
}

#[test]
fn test_relation_holds_is_strict() {
    assert!(Relation::GreaterThan.holds(2.0, 1.0));
    assert!(!Relation::GreaterThan.holds(1.0, 1.0));
    assert!(Relation::LessThan.holds(0.5, 1.0));
    assert!(!Relation::LessThan.holds(1.0, 1.0));
}

#[test]
fn test_parse_primary() {
    let spec = StainSpec::parse_primary("PI-A:>:2.5").unwrap();
    assert_eq!(spec.channel, "PI-A");
    assert_eq!(spec.relation, Relation::GreaterThan);
    assert_eq!(spec.threshold, 2.5);
    assert_eq!(spec.label, None);
    assert_eq!(spec.label_or("dead"), "dead");
}

#[test]
fn test_parse_primary_channel_with_colon() {
    let spec = StainSpec::parse_primary("FL1:A:<:-0.5").unwrap();
    assert_eq!(spec.channel, "FL1:A");
    assert_eq!(spec.threshold, -0.5);
}

#[test]
fn test_parse_extra() {
    let spec = StainSpec::parse_extra("GFP-A:>:1.2:gfp_positive").unwrap();
    assert_eq!(spec.channel, "GFP-A");
    assert_eq!(spec.label_or("x"), "gfp_positive");
}

#[test]
fn test_parse_rejects_garbage() {
    assert!(StainSpec::parse_primary("PI-A>2").is_err());
    assert!(StainSpec::parse_primary("PI-A:>:abc").is_err());
    assert!(StainSpec::parse_primary(":>:1").is_err());
    assert!(StainSpec::parse_extra("GFP:>:1:").is_err());
}
