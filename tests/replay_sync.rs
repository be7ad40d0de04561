use std::sync::Arc;

use wicket_sync::{
    HttpExchange, InterfaceUpdater, MemoryHandler, MessageHelpers, Parameter, ParameterType,
    RawMessageHelpers, RecordedExchange, SessionHandlingAction, Severity, SyncConfig, SyncError,
    WriterHandler,
};

const STALE_REQUEST: &str = "GET /app/?wicket:interface=foo:1:bar::baz&x_hf_0=&keep=me HTTP/1.1\r\n\
Host: shop.example\r\n\
Cookie: JSESSIONID=0A1B2C\r\n\
\r\n";

fn page(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html;charset=UTF-8\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
}

fn macro_step(body: &str) -> RecordedExchange {
    RecordedExchange::new("GET /app/ HTTP/1.1\r\nHost: shop.example\r\n\r\n").with_response(page(body))
}

fn updater_with_memory() -> (InterfaceUpdater, Arc<MemoryHandler>) {
    let memory = Arc::new(MemoryHandler::new());
    let updater = InterfaceUpdater::builder()
        .with_event_handler(memory.clone())
        .build()
        .unwrap();
    (updater, memory)
}

fn request_text(exchange: &RecordedExchange) -> String {
    String::from_utf8(exchange.request().to_vec()).unwrap()
}

#[test]
fn rewrites_interface_and_adds_fresh_identifier() {
    let (updater, memory) = updater_with_memory();
    let mut current = RecordedExchange::new(STALE_REQUEST);
    let macro_items = vec![macro_step(
        r#"<a href="?wicket:interface=:999:cart::ILinkListener::">cart</a>
           <form id="xyz"><input type="hidden" name="xyz_hf_0" id="xyz_hf_0"/></form>"#,
    )];

    let updated = updater
        .perform(Some(&mut current), Some(macro_items.as_slice()))
        .unwrap();

    assert_eq!(updated.interface.value, "foo:999:bar::baz");
    assert_eq!(updated.field, Parameter::new("xyz_hf_0", "", ParameterType::Url));

    let params = RawMessageHelpers::new()
        .parameters(current.request())
        .unwrap();
    assert_eq!(
        params,
        vec![
            Parameter::new("wicket:interface", "foo:999:bar::baz", ParameterType::Url),
            Parameter::new("x_hf_0", "", ParameterType::Url),
            Parameter::new("keep", "me", ParameterType::Url),
            Parameter::new("xyz_hf_0", "", ParameterType::Url),
            Parameter::new("JSESSIONID", "0A1B2C", ParameterType::Cookie),
        ]
    );
    assert!(request_text(&current).ends_with("Host: shop.example\r\nCookie: JSESSIONID=0A1B2C\r\n\r\n"));
    assert!(memory.errors().is_empty());
    assert_eq!(memory.messages(Severity::Info).len(), 2);
}

#[test]
fn missing_interface_token_leaves_request_identical() {
    let (updater, memory) = updater_with_memory();
    let mut current = RecordedExchange::new(STALE_REQUEST);
    let macro_items = vec![macro_step(r#"<input type="hidden" name="xyz_hf_0"/>"#)];

    let result = updater.perform(Some(&mut current), Some(macro_items.as_slice()));

    assert_eq!(result, Err(SyncError::NoUpdateProduced));
    assert_eq!(current.request(), STALE_REQUEST.as_bytes());

    let interface_errors: Vec<_> = memory
        .messages(Severity::Error)
        .into_iter()
        .filter(|line| line.contains("interface token"))
        .collect();
    assert_eq!(interface_errors.len(), 1);
    assert_eq!(
        memory.errors(),
        vec![
            SyncError::InterfaceTokenNotFound { index: 0 },
            SyncError::NoUpdateProduced,
        ]
    );
}

#[test]
fn missing_field_token_leaves_request_identical() {
    let (updater, memory) = updater_with_memory();
    let mut current = RecordedExchange::new(STALE_REQUEST);
    let macro_items = vec![macro_step(r#"<a href="?wicket:interface=:5:page::">x</a>"#)];

    let result = updater.perform(Some(&mut current), Some(macro_items.as_slice()));

    assert_eq!(result, Err(SyncError::NoUpdateProduced));
    assert_eq!(current.request(), STALE_REQUEST.as_bytes());
    assert_eq!(memory.errors()[0], SyncError::FieldTokenNotFound { index: 0 });
}

#[test]
fn later_macro_step_takes_precedence() {
    let (updater, _) = updater_with_memory();
    let mut current = RecordedExchange::new(STALE_REQUEST);
    let macro_items = vec![
        macro_step("wicket:interface=:10:home:: first_hf_0"),
        RecordedExchange::new("GET /app/next HTTP/1.1\r\n\r\n"),
        macro_step("wicket:interface=:11:checkout:: second_hf_0 third_hf_0"),
    ];

    let updated = updater
        .perform(Some(&mut current), Some(macro_items.as_slice()))
        .unwrap();

    assert_eq!(updated.source_entry, 2);
    assert!(request_text(&current).starts_with(
        "GET /app/?wicket:interface=foo:11:bar::baz&x_hf_0=&keep=me&second_hf_0= HTTP/1.1\r\n"
    ));
}

#[test]
fn form_post_is_rewritten_in_the_body() {
    let body = "wicket%3Ainterface=ignored&name=alice";
    let request = format!(
        "POST /app/?wicket:interface=:3:form::IFormSubmitListener:: HTTP/1.1\r\n\
Host: shop.example\r\n\
Content-Type: application/x-www-form-urlencoded\r\n\
Content-Length: {}\r\n\
\r\n{}",
        body.len(),
        body
    );
    let (updater, _) = updater_with_memory();
    let mut current = RecordedExchange::new(request.clone());
    let macro_items = vec![macro_step(
        r#"<form action="?wicket:interface=:4:form::IFormSubmitListener::"><input name="form_hf_0"/></form>"#,
    )];

    updater
        .perform(Some(&mut current), Some(macro_items.as_slice()))
        .unwrap();

    let text = request_text(&current);
    assert!(text.starts_with(
        "POST /app/?wicket:interface=:4:form::IFormSubmitListener::&form_hf_0= HTTP/1.1\r\n"
    ));
    assert!(text.ends_with(&format!("\r\n\r\n{body}")));
}

#[test]
fn host_action_reports_to_writer_sinks() {
    let writer = Arc::new(WriterHandler::new(Vec::<u8>::new(), Vec::<u8>::new()));
    let updater = InterfaceUpdater::builder()
        .with_event_handler(writer.clone())
        .disable_logging()
        .build()
        .unwrap();

    let mut current = RecordedExchange::new(STALE_REQUEST);
    updater.perform_action(Some(&mut current), None);
    let macro_items = vec![RecordedExchange::new("GET / HTTP/1.1\r\n\r\n")];
    updater.perform_action(Some(&mut current), Some(macro_items.as_slice()));

    drop(updater);
    let writer = Arc::try_unwrap(writer).ok().unwrap();
    let (out, err) = writer.into_inner();
    assert_eq!(String::from_utf8(out).unwrap(), "no macro defined\n");
    assert_eq!(
        String::from_utf8(err).unwrap(),
        "macro entry 0: no response\nno new values found in macro responses\n"
    );
    assert_eq!(current.request(), STALE_REQUEST.as_bytes());
}

#[test]
fn custom_convention_from_json() {
    let config = SyncConfig::from_json_str(
        r#"{"interface_parameter": "app:iface", "field_marker": "_hidden"}"#,
    )
    .unwrap();
    let updater = InterfaceUpdater::builder()
        .with_config(config)
        .disable_logging()
        .build()
        .unwrap();

    let mut current =
        RecordedExchange::new("GET /?app:iface=p:1:q::r HTTP/1.1\r\nHost: h\r\n\r\n");
    let macro_items = vec![macro_step("app:iface=:6: login_hidden")];

    updater
        .perform(Some(&mut current), Some(macro_items.as_slice()))
        .unwrap();

    assert_eq!(
        request_text(&current),
        "GET /?app:iface=p:6:q::r&login_hidden= HTTP/1.1\r\nHost: h\r\n\r\n"
    );
}
