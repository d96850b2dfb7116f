//! Route resolution behaviour through the public router API.

use axum::http::Method;
use pretty_assertions::assert_eq;

use grove::routing::{compile, Params, PatternError, RouteError, Router};

fn bindings(params: &Params) -> Vec<(&str, &str)> {
    params.iter().collect()
}

#[test]
fn resolves_value_and_bindings() {
    let mut router = Router::new();
    router.add_route(Method::GET, "/users/:id/posts/:post", "posts").unwrap();

    let resolved = router.resolve(&Method::GET, "/users/7/posts/hello").unwrap();
    assert_eq!(*resolved.value, "posts");
    assert_eq!(bindings(&resolved.params), vec![("id", "7"), ("post", "hello")]);
}

#[test]
fn static_beats_dynamic() {
    let mut router = Router::new();
    router.add_route(Method::GET, "/a/:x", "named").unwrap();
    router.add_route(Method::GET, "/a/b", "static").unwrap();

    let resolved = router.resolve(&Method::GET, "/a/b").unwrap();
    assert_eq!(*resolved.value, "static");
    assert!(resolved.params.is_empty());

    let resolved = router.resolve(&Method::GET, "/a/c").unwrap();
    assert_eq!(*resolved.value, "named");
    assert_eq!(resolved.params.get("x"), Some("c"));
}

#[test]
fn regex_segments_are_enforced() {
    let mut router = Router::new();
    router.add_route(Method::GET, r"/{n:\d+}", "number").unwrap();

    assert_eq!(*router.resolve(&Method::GET, "/123").unwrap().value, "number");
    assert!(matches!(
        router.resolve(&Method::GET, "/abc"),
        Err(RouteError::NotFound { .. })
    ));
    // Anchored: a partial match is not a match.
    assert!(router.resolve(&Method::GET, "/12a").is_err());
}

#[test]
fn wildcard_captures_the_remainder() {
    let mut router = Router::new();
    router.add_route(Method::GET, "/files/*path", "files").unwrap();

    let resolved = router.resolve(&Method::GET, "/files/a/b/c").unwrap();
    assert_eq!(resolved.params.get("path"), Some("a/b/c"));
    assert!(router.resolve(&Method::GET, "/files").is_err());
}

#[test]
fn paths_are_normalized() {
    let mut router = Router::new();
    router.add_route(Method::GET, "/a/b", "ab").unwrap();
    router.add_route(Method::GET, "/", "root").unwrap();

    assert_eq!(*router.resolve(&Method::GET, "/a//b/").unwrap().value, "ab");
    assert_eq!(*router.resolve(&Method::GET, "/").unwrap().value, "root");
    assert_eq!(*router.resolve(&Method::GET, "//").unwrap().value, "root");
}

#[test]
fn backtracks_out_of_a_failed_static_branch() {
    let mut router = Router::new();
    router.add_route(Method::GET, "/a/b/c", "deep-static").unwrap();
    router.add_route(Method::GET, "/a/:x/d", "named-then-static").unwrap();

    let resolved = router.resolve(&Method::GET, "/a/b/d").unwrap();
    assert_eq!(*resolved.value, "named-then-static");
    assert_eq!(bindings(&resolved.params), vec![("x", "b")]);
}

#[test]
fn regex_tried_before_named() {
    let mut router = Router::new();
    router.add_route(Method::GET, "/re2/:any", "named").unwrap();
    router.add_route(Method::GET, "/re2/{id:[a-z]+}", "regex").unwrap();
    router.add_route(Method::GET, "/re2/{id:[a-z]+}/test", "regex-test").unwrap();

    assert_eq!(*router.resolve(&Method::GET, "/re2/abc").unwrap().value, "regex");
    assert_eq!(*router.resolve(&Method::GET, "/re2/123").unwrap().value, "named");
    assert_eq!(*router.resolve(&Method::GET, "/re2/abc/test").unwrap().value, "regex-test");
}

#[test]
fn dated_regex_route_end_to_end() {
    let mut router = Router::new();
    router
        .add_route(
            Method::GET,
            "/re3/{year:[12][0-9]{3}}/{month:[1-9]{2}}/{day:[1-9]{2}}/{hour:(12|[3-9])}",
            "re3",
        )
        .unwrap();

    let resolved = router.resolve(&Method::GET, "/re3/2019/11/22/12").unwrap();
    assert_eq!(
        bindings(&resolved.params),
        vec![("year", "2019"), ("month", "11"), ("day", "22"), ("hour", "12")]
    );

    let resolved = router.resolve(&Method::GET, "/re3/1999/19/99/5").unwrap();
    assert_eq!(resolved.params.get("hour"), Some("5"));

    for miss in [
        "/re3/3019/11/22/12",
        "/re3/2019/10/22/12",
        "/re3/2019/11/22/13",
        "/re3/2019/11/22",
        // Segment regexes must match the whole segment: `[1-9]{2}` rejects "08".
        "/re3/2024/08/17/12",
        "/re3/abcd/08/17/12",
    ] {
        assert!(
            matches!(router.resolve(&Method::GET, miss), Err(RouteError::NotFound { .. })),
            "{miss} should not match"
        );
    }
}

#[test]
fn methods_have_separate_tables() {
    let mut router = Router::new();
    router.add_route(Method::GET, "/x", "get").unwrap();
    router.add_route(Method::POST, "/x", "post").unwrap();

    assert_eq!(*router.resolve(&Method::POST, "/x").unwrap().value, "post");
    assert!(router.resolve(&Method::PUT, "/x").is_err());
    assert_eq!(router.allowed("/x"), vec![Method::GET, Method::POST]);
}

#[test]
fn invalid_patterns_are_rejected() {
    assert!(matches!(compile(""), Err(PatternError::Empty)));
    assert!(matches!(compile("/a/*rest/b"), Err(PatternError::WildcardNotLast { .. })));
    assert!(matches!(compile("/{id:[0-9}"), Err(PatternError::InvalidRegex { .. })));
    assert!(matches!(compile("/{id}"), Err(PatternError::MalformedRegexSegment { .. })));
    assert!(matches!(compile("/:"), Err(PatternError::EmptyName { .. })));
    assert!(matches!(compile("/:id/:id"), Err(PatternError::DuplicateName { .. })));

    let mut router: Router<()> = Router::new();
    assert!(matches!(
        router.add_route(Method::GET, "/:a/*a", ()),
        Err(RouteError::InvalidPattern(PatternError::DuplicateName { .. }))
    ));
}

#[test]
fn conflicting_dynamic_names_are_rejected() {
    let mut router = Router::new();
    router.add_route(Method::GET, "/u/:id", 1).unwrap();
    assert!(matches!(
        router.add_route(Method::GET, "/u/:name/x", 2),
        Err(RouteError::Conflict { .. })
    ));

    router.add_route(Method::GET, r"/n/{id:\d+}", 3).unwrap();
    assert!(matches!(
        router.add_route(Method::GET, r"/n/{id:\d{2}}", 4),
        Err(RouteError::Conflict { .. })
    ));
}

#[test]
fn identical_registration_replaces_value() {
    let mut router = Router::new();
    assert_eq!(router.add_route(Method::GET, "/p/:id", 1).unwrap(), None);
    assert_eq!(router.add_route(Method::GET, "/p/:id", 2).unwrap(), Some(1));
    assert_eq!(*router.resolve(&Method::GET, "/p/9").unwrap().value, 2);
}
