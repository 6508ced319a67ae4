//! End-to-end chain tests.
//!
//! These build whole chains through the public builder and drive them with
//! an in-memory writer, covering:
//!
//! 1. Ordering and termination
//! 2. Context sharing between units, and isolation between requests
//! 3. Transactions on the shared store
//! 4. Build-time rejection of unsupported values and double injection
//! 5. Nesting chains

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use http::{Request as HttpRequest, StatusCode};
use http_body_util::Full;
use proptest::prelude::*;
use stackwork_core::{
    empty_request, handler_fn, ChainConfig, Context, Handler, Origin, Request, ResponseBuffer,
    ResponseWriter, SharedHandler, StackError, StackResult,
};
use stackwork_middleware::{
    context, context_of, naive, stages::{After, Catch, Guard, Stop}, Candidate, Chain, Entry,
    UnitKind,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Note(String);

fn make_request(method: &str, path: &str) -> Request {
    HttpRequest::builder()
        .method(method)
        .uri(path)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn write(text: &'static str) -> impl Handler {
    handler_fn(move |w, _req| {
        w.write(text.as_bytes());
        Ok(())
    })
}

fn run(chain: &Chain) -> ResponseBuffer {
    let mut buffer = ResponseBuffer::new();
    chain.serve(&mut buffer, &mut make_request("GET", "/")).unwrap();
    buffer
}

// Appends `suffix` to the stored note, if there is one.
fn append_note(suffix: &'static str) -> impl Fn(&Context, &mut dyn ResponseWriter, &mut Request) -> StackResult<()> + Send + Sync + 'static {
    move |ctx, _w, _req| {
        ctx.transaction(|tx| {
            if let Some(Note(current)) = tx.remove::<Note>() {
                tx.set(Note(current + suffix));
            }
        })
    }
}

fn write_note(ctx: &Context, w: &mut dyn ResponseWriter) {
    if let Some(Note(note)) = ctx.get::<Note>() {
        w.write(note.as_bytes());
    }
}

// ---- ordering ----------------------------------------------------------

#[test]
fn test_units_run_in_registration_order() {
    let chain = Chain::builder()
        .before(write("x"))
        .before(write("y"))
        .middleware_fn(|w, req, next| {
            w.write(b"w");
            next.serve(w, req)
        })
        .wrap(write("z"))
        .unwrap();

    assert_eq!(run(&chain).body_str(), "xywz");
}

#[test]
fn test_terminal_cuts_off_later_units() {
    let later = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&later);

    let chain = Chain::builder()
        .before(write("a"))
        .terminal(write("b"))
        .before_fn(move |_w, _req| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .wrap(write("c"))
        .unwrap();

    assert_eq!(run(&chain).body_str(), "ab");
    assert_eq!(later.load(Ordering::SeqCst), 0);
}

#[test]
fn test_stop_ends_chain() {
    let chain = Chain::builder()
        .before(write("a"))
        .terminal(Stop)
        .wrap(write("never"))
        .unwrap();
    assert_eq!(run(&chain).body_str(), "a");
}

#[test]
fn test_guard_and_after() {
    let chain = Chain::builder()
        .middleware(Guard::new(handler_fn(|w, req| {
            if req.uri().path() == "/private" {
                w.set_status(StatusCode::FORBIDDEN);
            }
            Ok(())
        })))
        .middleware(After::new(write(" logged")))
        .wrap(write("page"))
        .unwrap();

    let mut open = ResponseBuffer::new();
    chain.serve(&mut open, &mut make_request("GET", "/open")).unwrap();
    assert_eq!(open.body_str(), "page logged");

    let mut private = ResponseBuffer::new();
    chain
        .serve(&mut private, &mut make_request("GET", "/private"))
        .unwrap();
    assert_eq!(private.status(), Some(StatusCode::FORBIDDEN));
    assert_eq!(private.body_str(), "");
}

#[test]
fn test_unit_error_propagates() {
    let chain = Chain::builder()
        .before_fn(|_w, _req| Err(StackError::unit_msg("rejected")))
        .wrap(write("never"))
        .unwrap();

    let mut buffer = ResponseBuffer::new();
    let err = chain
        .serve(&mut buffer, &mut empty_request("/"))
        .unwrap_err();
    assert!(err.to_string().contains("rejected"));
    assert_eq!(buffer.body_str(), "");
}

#[test]
fn test_catch_recovers_panicking_terminal() {
    let chain = Chain::builder()
        .middleware(Catch::new(|message, w, _req| {
            w.set_status(StatusCode::INTERNAL_SERVER_ERROR);
            w.write(message.as_bytes());
            Ok(())
        }))
        .wrap_fn(|_w, _req| panic!("handler exploded"))
        .unwrap();

    let buffer = run(&chain);
    assert_eq!(buffer.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(buffer.body_str(), "handler exploded");
}

// ---- context -----------------------------------------------------------

#[test]
fn test_context_flows_through_units() {
    let chain = Chain::builder()
        .context_before(append_note("prepended"))
        .context_before_fn(|ctx, _w, _req| {
            ctx.set(Note("hiho".to_string()));
            Ok(())
        })
        .context_before(append_note("-appended"))
        .context_middleware_fn(|ctx, w, req, next| {
            write_note(ctx, w);
            next.serve(w, req)
        })
        .context_before_fn(|ctx, _w, _req| {
            ctx.remove::<Note>();
            Ok(())
        })
        .context_terminal_fn(|ctx, w, _req| {
            write_note(ctx, w);
            Ok(())
        })
        .context_terminal_fn(|_ctx, w, _req| {
            w.write(b"unreachable");
            Ok(())
        })
        .build_with_context()
        .unwrap();

    assert_eq!(run(&chain).body_str(), "hiho-appended");
}

#[test]
fn test_each_request_gets_a_fresh_store() {
    let chain = Chain::builder()
        .context_before_fn(|ctx, w, _req| {
            if ctx.contains::<Note>() {
                w.write(b"leaked ");
            }
            ctx.set(Note("first".to_string()));
            Ok(())
        })
        .wrap_fn_with_context(|ctx, w, _req| {
            write_note(ctx, w);
            Ok(())
        })
        .unwrap();

    assert_eq!(run(&chain).body_str(), "first");
    assert_eq!(run(&chain).body_str(), "first");
}

#[test]
fn test_origin_visible_to_every_unit() {
    let seen = Arc::new(AtomicUsize::new(0));
    let before = Arc::clone(&seen);
    let terminal = Arc::clone(&seen);

    let chain = Chain::builder()
        .context_before_fn(move |ctx, _w, _req| {
            if ctx.get::<Origin>().is_some() {
                before.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        })
        .wrap_fn_with_context(move |ctx, _w, _req| {
            let origin = ctx.get::<Origin>().expect("origin");
            assert!(origin.writer_kind().ends_with("ResponseBuffer"));
            terminal.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    run(&chain);
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[test]
fn test_plain_handler_reads_store_through_writer() {
    let chain = Chain::builder()
        .context_before_fn(|ctx, _w, _req| {
            ctx.set(Note("via writer".to_string()));
            Ok(())
        })
        .terminal_fn(|w, _req| {
            let ctx = context_of(w)?;
            write_note(&ctx, w);
            Ok(())
        })
        .build_with_context()
        .unwrap();

    assert_eq!(run(&chain).body_str(), "via writer");
}

#[test]
fn test_naive_handler_in_context_slot() {
    let chain = Chain::builder()
        .context_before(naive(write("plain ")))
        .wrap_with_context(naive(write("terminal")))
        .unwrap();
    assert_eq!(run(&chain).body_str(), "plain terminal");
}

#[test]
fn test_context_unit_without_adapter_fails_at_request_time() {
    let chain = Chain::builder()
        .context_before_fn(|_ctx, _w, _req| Ok(()))
        .build()
        .unwrap();

    let mut buffer = ResponseBuffer::new();
    let err = chain
        .serve(&mut buffer, &mut empty_request("/"))
        .unwrap_err();
    assert!(matches!(err, StackError::ContextMissing { .. }));
    assert!(err.is_programmer_error());
}

#[test]
fn test_adapter_wrapper_equals_build_with_context() {
    let chain = Chain::builder()
        .wrapper(context())
        .context_before_fn(|ctx, _w, _req| {
            ctx.set(Note("wrapped".to_string()));
            Ok(())
        })
        .context_terminal_fn(|ctx, w, _req| {
            write_note(ctx, w);
            Ok(())
        })
        .build()
        .unwrap();

    assert!(chain.injects_context());
    assert_eq!(run(&chain).body_str(), "wrapped");
}

#[test]
fn test_nested_transaction_is_reported() {
    let chain = Chain::builder()
        .wrap_fn_with_context(|ctx, _w, _req| {
            ctx.transaction(|_tx| ctx.transaction(|_inner| ()))?
        })
        .unwrap();

    let mut buffer = ResponseBuffer::new();
    let err = chain
        .serve(&mut buffer, &mut empty_request("/"))
        .unwrap_err();
    assert!(matches!(err, StackError::NestedTransaction));
}

// ---- nesting -----------------------------------------------------------

#[test]
fn test_inner_chain_shares_outer_store() {
    let inner = Chain::builder()
        .context_before(append_note(" inner"))
        .build()
        .unwrap();

    let outer = Chain::builder()
        .context_before_fn(|ctx, _w, _req| {
            ctx.set(Note("outer".to_string()));
            Ok(())
        })
        .before(inner)
        .wrap_fn_with_context(|ctx, w, _req| {
            write_note(ctx, w);
            Ok(())
        })
        .unwrap();

    assert_eq!(run(&outer).body_str(), "outer inner");
}

#[test]
fn test_embedding_injected_chain_is_rejected() {
    let inner = Chain::builder().build_with_context().unwrap();

    let err = Chain::builder().before(inner.clone()).build().unwrap_err();
    assert!(matches!(err, StackError::DoubleInjection { .. }));

    let err = Chain::builder()
        .wrap(inner)
        .and_then(|outer| Chain::builder().terminal(outer).build_with_context())
        .unwrap_err();
    assert!(matches!(err, StackError::DoubleInjection { .. }));
}

// ---- dynamic registration ----------------------------------------------

struct Opaque;
impl Candidate for Opaque {}

struct Greeter;

impl Handler for Greeter {
    fn serve(&self, w: &mut dyn ResponseWriter, _req: &mut Request) -> StackResult<()> {
        w.write(b"greetings");
        Ok(())
    }
}

impl Candidate for Greeter {
    fn as_handler(self: Arc<Self>) -> Option<SharedHandler> {
        Some(self)
    }

    fn describe(&self) -> Option<String> {
        Some("greeter".to_string())
    }
}

#[test]
fn test_unsupported_value_fails_build() {
    let err = stackwork_middleware::compile([Entry::candidate(Greeter), Entry::candidate(Opaque)])
        .unwrap_err();
    match err {
        StackError::UnsupportedUnitKind { type_name } => assert!(type_name.ends_with("Opaque")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_candidate_is_classified_and_listed() {
    let chain = Chain::builder_with(ChainConfig::debug())
        .before(write("> "))
        .candidate(Greeter)
        .build()
        .unwrap();

    assert_eq!(run(&chain).body_str(), "> greetings");
    let kinds: Vec<_> = chain.descriptors().iter().map(|d| d.kind()).collect();
    assert_eq!(kinds, [UnitKind::Middleware, UnitKind::Handler]);
    assert_eq!(chain.descriptors()[1].description(), Some("greeter"));
    assert!(chain.to_string().contains("1: handler"));
    assert!(chain.to_string().contains("chain_e2e.rs"));
}

// ---- properties --------------------------------------------------------

proptest! {
    #[test]
    fn prop_before_units_run_in_order(labels in prop::collection::vec("[a-z]{1,4}", 0..12)) {
        let mut builder = Chain::builder_with(ChainConfig::quiet());
        for label in &labels {
            let label = label.clone();
            builder = builder.before_fn(move |w, _req| {
                w.write(label.as_bytes());
                Ok(())
            });
        }
        let chain = builder.build().unwrap();

        prop_assert_eq!(chain.len(), labels.len());
        prop_assert_eq!(run(&chain).body_str(), labels.concat());
    }

    #[test]
    fn prop_terminal_position_bounds_output(count in 1_usize..10, stop_at in 0_usize..10) {
        let stop_at = stop_at % count;
        let mut builder = Chain::builder_with(ChainConfig::quiet());
        for index in 0..count {
            let byte = b'a' + u8::try_from(index).unwrap();
            if index == stop_at {
                builder = builder.terminal_fn(move |w, _req| {
                    w.write(&[byte]);
                    Ok(())
                });
            } else {
                builder = builder.before_fn(move |w, _req| {
                    w.write(&[byte]);
                    Ok(())
                });
            }
        }
        let chain = builder.build().unwrap();

        let expected: String = (0..=stop_at)
            .map(|i| char::from(b'a' + u8::try_from(i).unwrap()))
            .collect();
        prop_assert_eq!(run(&chain).body_str(), expected);
    }
}
