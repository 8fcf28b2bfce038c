use std::collections::HashMap;

use super::RouteTemplate;
use crate::error::RouteError;
use crate::router::ParamVec;

fn path(t: &str) -> RouteTemplate {
    RouteTemplate::compile(t, false, false, false).unwrap()
}

fn extract(tpl: &RouteTemplate, component: &str) -> Option<Vec<(String, String)>> {
    let mut params = ParamVec::new();
    if !tpl.extract(component, &mut params) {
        return None;
    }
    Some(
        params
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

#[test]
fn test_static_path_is_anchored() {
    let tpl = path("/a/b");
    assert!(tpl.is_match("/a/b"));
    assert!(!tpl.is_match("/a/b/"));
    assert!(!tpl.is_match("/a/b/c"));
    assert!(!tpl.is_match("/x/a/b"));
}

#[test]
fn test_default_variable_stops_at_slash() {
    let tpl = path("/users/{id}");
    assert_eq!(
        extract(&tpl, "/users/42"),
        Some(vec![("id".into(), "42".into())])
    );
    assert!(extract(&tpl, "/users/42/posts").is_none());
    assert!(extract(&tpl, "/users/").is_none());
}

#[test]
fn test_custom_pattern() {
    let tpl = path("/users/{id:[0-9]+}");
    assert!(tpl.is_match("/users/42"));
    assert!(!tpl.is_match("/users/abc"));
}

#[test]
fn test_pattern_with_nested_braces_and_groups() {
    let tpl = path("/archive/{year:[0-9]{4}}/{slug:(foo|bar)-[a-z]+}");
    assert_eq!(
        extract(&tpl, "/archive/2024/foo-post"),
        Some(vec![
            ("year".into(), "2024".into()),
            ("slug".into(), "foo-post".into())
        ])
    );
    assert!(!tpl.is_match("/archive/24/foo-post"));
}

#[test]
fn test_literal_text_is_escaped() {
    let tpl = path("/files/{name}.json");
    assert!(tpl.is_match("/files/report.json"));
    assert!(!tpl.is_match("/files/reportxjson"));
}

#[test]
fn test_prefix_anchors_start_only() {
    let tpl = RouteTemplate::compile("/static", false, true, true).unwrap();
    assert!(tpl.is_prefix());
    assert!(!tpl.is_loose_trailing_slash());
    assert!(tpl.is_match("/static/css/site.css"));
    assert!(tpl.is_match("/static"));
    assert!(!tpl.is_match("/assets/static"));
}

#[test]
fn test_loose_trailing_slash() {
    let tpl = RouteTemplate::compile("/a/b", false, false, true).unwrap();
    assert!(tpl.is_match("/a/b"));
    assert!(tpl.is_match("/a/b/"));
    assert!(!tpl.is_match("/a/b//"));

    let tpl = RouteTemplate::compile("/a/b/", false, false, true).unwrap();
    assert!(tpl.is_match("/a/b"));
    assert!(tpl.is_match("/a/b/"));
    assert!(tpl.ends_with_slash());
}

#[test]
fn test_host_template() {
    let tpl = RouteTemplate::compile("{sub}.example.com", true, true, true).unwrap();
    assert!(tpl.is_host());
    assert!(!tpl.is_prefix());
    assert_eq!(
        extract(&tpl, "api.example.com"),
        Some(vec![("sub".into(), "api".into())])
    );
    assert!(!tpl.is_match("a.b.example.com"));
    assert!(!tpl.is_match("api.example.com.evil"));
}

#[test]
fn test_path_must_start_with_slash() {
    assert_eq!(
        RouteTemplate::compile("users", false, false, false).unwrap_err(),
        RouteError::InvalidTemplate {
            template: "users".into()
        }
    );
}

#[test]
fn test_duplicate_variable_rejected() {
    let err = RouteTemplate::compile("/{id}/{id}", false, false, false).unwrap_err();
    assert_eq!(err, RouteError::DuplicateVariable { name: "id".into() });
}

#[test]
fn test_malformed_placeholders() {
    assert!(matches!(
        RouteTemplate::compile("/{id", false, false, false),
        Err(RouteError::UnbalancedBraces { .. })
    ));
    assert!(matches!(
        RouteTemplate::compile("/{}", false, false, false),
        Err(RouteError::MissingNameOrPattern { .. })
    ));
    assert!(matches!(
        RouteTemplate::compile("/{id:}", false, false, false),
        Err(RouteError::MissingNameOrPattern { .. })
    ));
    assert!(matches!(
        RouteTemplate::compile("/{id:[0-9}", false, false, false),
        Err(RouteError::InvalidPattern { .. })
    ));
}

#[test]
fn test_disjoint_host_and_path() {
    let host = RouteTemplate::compile("{id}.example.com", true, false, false).unwrap();
    let p = path("/items/{id}");
    assert_eq!(
        p.ensure_disjoint(&host),
        Err(RouteError::DuplicateVariable { name: "id".into() })
    );
    let p = path("/items/{item}");
    assert!(p.ensure_disjoint(&host).is_ok());
}

#[test]
fn test_build_substitutes_and_validates() {
    let tpl = path("/articles/{category}/{id:[0-9]+}");
    let mut values = HashMap::new();
    values.insert("category", "tech");
    values.insert("id", "42");
    values.insert("unused", "x");
    assert_eq!(tpl.build(&values).unwrap(), "/articles/tech/42");

    values.insert("id", "forty-two");
    assert!(matches!(
        tpl.build(&values),
        Err(RouteError::VariableMismatch { ref name, .. }) if name == "id"
    ));

    values.remove("category");
    assert_eq!(
        tpl.build(&values),
        Err(RouteError::MissingVariable {
            name: "category".into()
        })
    );
}

#[test]
fn test_build_keeps_trailing_slash_of_loose_template() {
    let tpl = RouteTemplate::compile("/users/{id}/", false, false, true).unwrap();
    let values = HashMap::from([("id", "7")]);
    assert_eq!(tpl.build(&values).unwrap(), "/users/7/");
}

#[test]
fn test_build_then_match_returns_same_values() {
    let tpl = path("/r/{a:[a-z]+}-{b:[0-9]{2}}/{c}");
    let cases = [("abc", "12", "x.y"), ("z", "00", "hello"), ("q", "99", "%20")];
    for (a, b, c) in cases {
        let values = HashMap::from([("a", a), ("b", b), ("c", c)]);
        let built = tpl.build(&values).unwrap();
        let got = extract(&tpl, &built).unwrap();
        assert_eq!(
            got,
            vec![
                ("a".to_string(), a.to_string()),
                ("b".to_string(), b.to_string()),
                ("c".to_string(), c.to_string()),
            ]
        );
    }
}

#[test]
fn test_greedy_last_variable_gives_back_trailing_slash() {
    let tpl = RouteTemplate::compile("/files/{p:.+}/", false, false, true).unwrap();
    for value in ["a", "a/b", "a/"] {
        let values = HashMap::from([("p", value)]);
        let built = tpl.build(&values).unwrap();
        assert_eq!(
            extract(&tpl, &built).unwrap(),
            vec![("p".to_string(), value.to_string())]
        );
    }
    assert_eq!(
        extract(&tpl, "/files/a/b").unwrap(),
        vec![("p".to_string(), "a/b".to_string())]
    );

    let exact = path("/files/{p:.+}/");
    assert_eq!(
        extract(&exact, "/files/a/").unwrap(),
        vec![("p".to_string(), "a".to_string())]
    );
}
