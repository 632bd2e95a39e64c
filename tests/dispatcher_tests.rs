use std::sync::Arc;

use http::Method;
use segroute::dispatcher::{Dispatcher, HandlerRequest, REQUEST_ID_HEADER};
use segroute::ids::RequestId;
use segroute::router::Router;
use segroute::RouterConfig;

mod common;
use common::{tag, CapturedLogs};

fn app() -> Arc<Router> {
    let router = Arc::new(Router::new());
    router.get("/x", tag("A")).unwrap();
    router.post("/x", tag("B")).unwrap();
    router
        .get("/users/:id", |req, res| {
            res.body = serde_json::json!({
                "id": req.get_path_param("id"),
                "verbose": req.get_query_param("verbose"),
            });
        })
        .unwrap();
    router.get("/docs/", tag("docs")).unwrap();
    router.get("/panic", |_req, _res| panic!("handler exploded")).unwrap();
    router
}

#[test]
fn test_dispatch_binds_params_into_request() {
    let dispatcher = Dispatcher::new(app());
    let res = dispatcher.dispatch(HandlerRequest::new(Method::GET, "/users/42?verbose=1"));
    assert_eq!(res.status, 200);
    assert_eq!(res.body["id"], "42");
    assert_eq!(res.body["verbose"], "1");
}

#[test]
fn test_dispatcher_prepares_routes() {
    let router = app();
    let dispatcher = Dispatcher::new(Arc::clone(&router));
    assert!(router.routes().iter().all(|r| r.is_prepared()));
    assert_eq!(dispatcher.router().len(), router.len());
}

#[test]
fn test_method_not_allowed_carries_allow_header() {
    let dispatcher = Dispatcher::new(app());
    let res = dispatcher.dispatch(HandlerRequest::new(Method::DELETE, "/x"));
    assert_eq!(res.status, 405);
    assert_eq!(res.get_header("allow"), Some("GET, POST"));
    assert_eq!(res.body["error"], "Method Not Allowed");

    assert_eq!(dispatcher.dispatch(HandlerRequest::new(Method::GET, "/x")).body, "A");
    assert_eq!(dispatcher.dispatch(HandlerRequest::new(Method::POST, "/x")).body, "B");
}

#[test]
fn test_not_found_default_and_custom() {
    let mut dispatcher = Dispatcher::new(app());
    let res = dispatcher.dispatch(HandlerRequest::new(Method::GET, "/nope"));
    assert_eq!(res.status, 404);
    assert_eq!(res.body, serde_json::json!({ "error": "Not Found" }));

    dispatcher.on_not_found(|req, res| {
        res.body = serde_json::json!({ "missing": req.path });
    });
    let res = dispatcher.dispatch(HandlerRequest::new(Method::GET, "/nope"));
    assert_eq!(res.status, 404);
    assert_eq!(res.body["missing"], "/nope");
}

#[test]
fn test_custom_method_not_allowed_handler_keeps_allow() {
    let mut dispatcher = Dispatcher::new(app());
    dispatcher.on_error(405, |_req, res| res.body = serde_json::json!("try another verb"));
    let res = dispatcher.dispatch(HandlerRequest::new(Method::PUT, "/x"));
    assert_eq!(res.status, 405);
    assert_eq!(res.body, "try another verb");
    assert_eq!(res.get_header("allow"), Some("GET, POST"));
}

#[test]
fn test_handler_panic_becomes_500() {
    let logs = CapturedLogs::init();
    let mut dispatcher = Dispatcher::new(app());
    let res = dispatcher.dispatch(HandlerRequest::new(Method::GET, "/panic"));
    assert_eq!(res.status, 500);
    assert_eq!(res.body["error"], "Internal Server Error");
    assert!(logs.contents().contains("handler exploded"));

    dispatcher.on_panic(|_req, res| res.body = serde_json::json!("sorry"));
    let res = dispatcher.dispatch(HandlerRequest::new(Method::GET, "/panic"));
    assert_eq!(res.status, 500);
    assert_eq!(res.body, "sorry");

    // the dispatcher keeps serving after a panic
    assert_eq!(dispatcher.dispatch(HandlerRequest::new(Method::GET, "/x")).status, 200);
}

#[test]
fn test_emit_error_from_outside_dispatch() {
    let mut dispatcher = Dispatcher::new(app());
    dispatcher.on_error(418, |_req, res| res.set_header("x-teapot", "yes".to_string()));
    let req = HandlerRequest::new(Method::GET, "/");
    let mut res = segroute::dispatcher::HandlerResponse::default();
    dispatcher.emit_error(418, &req, &mut res);
    assert_eq!(res.status, 418);
    assert_eq!(res.body["error"], "I'm a teapot");
    assert_eq!(res.get_header("x-teapot"), Some("yes"));
}

#[test]
fn test_path_correction_redirects_with_query() {
    let dispatcher = Dispatcher::new(app());
    let res = dispatcher.dispatch(HandlerRequest::new(Method::GET, "/users/42/?verbose=1"));
    assert_eq!(res.status, 301);
    assert_eq!(res.get_header("location"), Some("/users/42?verbose=1"));

    let res = dispatcher.dispatch(HandlerRequest::new(Method::GET, "/docs"));
    assert_eq!(res.status, 301);
    assert_eq!(res.get_header("location"), Some("/docs/"));
}

#[test]
fn test_path_correction_only_targets_servable_paths() {
    let router = Arc::new(Router::new());
    router.get("/a/", tag("slash")).unwrap();
    let dispatcher = Dispatcher::new(router);

    // `/a/` exists but does not take POST, so there is nothing to redirect to
    let res = dispatcher.dispatch(HandlerRequest::new(Method::POST, "/a"));
    assert_eq!(res.status, 404);
    assert!(res.get_header("location").is_none());

    let res = dispatcher.dispatch(HandlerRequest::new(Method::GET, "/a"));
    assert_eq!(res.status, 301);
    assert_eq!(res.get_header("location"), Some("/a/"));
}

#[test]
fn test_path_correction_can_be_disabled() {
    let config = RouterConfig {
        path_correction: false,
        ..RouterConfig::default()
    };
    let dispatcher = Dispatcher::with_config(app(), &config);
    let res = dispatcher.dispatch(HandlerRequest::new(Method::GET, "/users/42/"));
    assert_eq!(res.status, 404);
}

#[test]
fn test_request_id_is_propagated() {
    let dispatcher = Dispatcher::new(app());
    let inbound = RequestId::new().to_string();
    let req = HandlerRequest::new(Method::GET, "/x").with_header(REQUEST_ID_HEADER, inbound.clone());
    let res = dispatcher.dispatch(req);
    assert_eq!(res.get_header(REQUEST_ID_HEADER), Some(inbound.as_str()));

    let res = dispatcher.dispatch(HandlerRequest::new(Method::GET, "/x"));
    let generated = res.get_header(REQUEST_ID_HEADER).unwrap();
    assert!(generated.parse::<RequestId>().is_ok());

    let req = HandlerRequest::new(Method::GET, "/x").with_header(REQUEST_ID_HEADER, "not-a-ulid");
    let res = dispatcher.dispatch(req);
    let replaced = res.get_header(REQUEST_ID_HEADER).unwrap();
    assert_ne!(replaced, "not-a-ulid");
    assert!(replaced.parse::<RequestId>().is_ok());
}

#[test]
fn test_sink_answers_through_global_middleware() {
    let router = Arc::new(Router::new());
    router.use_fn(|req, res, next| {
        res.status = 204;
        next.run(req, res);
    });
    router.sink("/*").unwrap();
    let dispatcher = Dispatcher::new(router);
    let res = dispatcher.dispatch(HandlerRequest::new(Method::PATCH, "/any/thing"));
    assert_eq!(res.status, 405);
    let res = dispatcher.dispatch(HandlerRequest::new(Method::GET, "/any/thing"));
    assert_eq!(res.status, 204);
}
