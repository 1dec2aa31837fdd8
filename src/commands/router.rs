//! Command Dispatch and Handlers
//!
//! Takes one decoded request (an array with the command name first),
//! routes it by name, binds arguments against the command's schema, and
//! answers through the [`RequestContext`].
//!
//! Command-level failures - unknown command, argument errors, a bad PX
//! value - are replies, not connection errors: the client gets a simple
//! error frame and the connection stays up. Only I/O failures propagate
//! out of here.

use crate::commands::arguments::{ArgSchema, ArgSpec, Arguments};
use crate::connection::RequestContext;
use crate::protocol::RespValue;
use bytes::Bytes;
use std::io;
use std::time::Duration;
use tokio::io::AsyncWrite;

/// Routes one request to its handler.
pub async fn dispatch<W: AsyncWrite + Unpin>(
    ctx: &mut RequestContext<W>,
    request: &[RespValue],
) -> io::Result<()> {
    let Some((name, args)) = request.split_first() else {
        return ctx.send_error("ERR no command supplied").await;
    };
    let Some(name) = name.as_text() else {
        return ctx.send_error("ERR invalid command name").await;
    };

    match name.to_ascii_uppercase().as_str() {
        "PING" => ping(ctx).await,
        "ECHO" => echo(ctx, args).await,
        "GET" => get(ctx, args).await,
        "SET" => set(ctx, args).await,
        "CONFIG" => config(ctx, args).await,
        "KEYS" => keys(ctx, args).await,
        _ => {
            let msg = format!("ERR unknown command '{name}'");
            ctx.send_error(&msg).await
        }
    }
}

/// Binds `args` against `schema`, replying with the binding error on
/// failure. `Ok(None)` means the reply was already sent.
async fn bind<'a, W: AsyncWrite + Unpin>(
    ctx: &mut RequestContext<W>,
    schema: &ArgSchema,
    args: &'a [RespValue],
) -> io::Result<Option<Arguments<'a>>> {
    match schema.bind(args) {
        Ok(bound) => Ok(Some(bound)),
        Err(e) => {
            ctx.send_error(&e.to_string()).await?;
            Ok(None)
        }
    }
}

/// The payload of a text-shaped value, as owned-but-shared bytes.
fn value_bytes(value: &RespValue) -> Option<Bytes> {
    match value {
        RespValue::BulkString(b) | RespValue::SimpleString(b) => Some(b.clone()),
        _ => None,
    }
}

/// PING - answers `+PONG\r\n`, arguments ignored.
async fn ping<W: AsyncWrite + Unpin>(ctx: &mut RequestContext<W>) -> io::Result<()> {
    ctx.send_simple_string("PONG").await
}

/// ECHO message - answers the message exactly as it arrived.
async fn echo<W: AsyncWrite + Unpin>(
    ctx: &mut RequestContext<W>,
    args: &[RespValue],
) -> io::Result<()> {
    let schema = ArgSchema::new().positionals(1);
    let Some(bound) = bind(ctx, &schema, args).await? else {
        return Ok(());
    };
    ctx.send_value(bound.positional(0)).await
}

/// GET key - the stored value, or the null bulk string for missing and
/// expired keys alike.
async fn get<W: AsyncWrite + Unpin>(
    ctx: &mut RequestContext<W>,
    args: &[RespValue],
) -> io::Result<()> {
    let schema = ArgSchema::new().positionals(1);
    let Some(bound) = bind(ctx, &schema, args).await? else {
        return Ok(());
    };
    let Some(key) = value_bytes(bound.positional(0)) else {
        return ctx.send_error("ERR invalid key").await;
    };

    match ctx.store.get(&key) {
        Some(value) => ctx.send_value(&value).await,
        None => ctx.send_null_bulk_string().await,
    }
}

/// SET key value [PX milliseconds] - answers `+OK\r\n`.
async fn set<W: AsyncWrite + Unpin>(
    ctx: &mut RequestContext<W>,
    args: &[RespValue],
) -> io::Result<()> {
    let schema = ArgSchema::new()
        .positionals(2)
        .arg(ArgSpec::new("PX").with_value());
    let Some(bound) = bind(ctx, &schema, args).await? else {
        return Ok(());
    };
    let Some(key) = value_bytes(bound.positional(0)) else {
        return ctx.send_error("ERR invalid key").await;
    };
    let value = bound.positional(1).clone();

    if let Some(px) = bound.named("PX") {
        let millis = px
            .value
            .and_then(|v| v.as_text())
            .and_then(|text| text.parse::<i64>().ok());
        let Some(millis) = millis.filter(|ms| *ms > 0) else {
            return ctx.send_error("ERR invalid expire time in 'set' command").await;
        };
        ctx.store
            .set_with_ttl(key, value, Duration::from_millis(millis as u64));
    } else {
        ctx.store.set(key, value);
    }

    ctx.send_simple_string("OK").await
}

/// CONFIG GET key - a two-element array of key and value, or the null
/// bulk string for unrecognised keys. Only the GET operation exists.
async fn config<W: AsyncWrite + Unpin>(
    ctx: &mut RequestContext<W>,
    args: &[RespValue],
) -> io::Result<()> {
    let schema = ArgSchema::new().positionals(2);
    let Some(bound) = bind(ctx, &schema, args).await? else {
        return Ok(());
    };

    if !bound.positional(0).eq_ignore_ascii_case("GET") {
        return ctx
            .send_error("ERR config command only supports get operations")
            .await;
    }
    let Some(key) = bound.positional(1).as_text() else {
        return ctx.send_error("ERR invalid config key").await;
    };

    match ctx.config.get(key) {
        Some(value) => {
            let items = [Bytes::copy_from_slice(key.as_bytes()), Bytes::from(value)];
            ctx.send_string_array(&items).await
        }
        None => ctx.send_null_bulk_string().await,
    }
}

/// KEYS pattern - all live keys. Only the trivial `*` pattern is
/// supported.
async fn keys<W: AsyncWrite + Unpin>(
    ctx: &mut RequestContext<W>,
    args: &[RespValue],
) -> io::Result<()> {
    let schema = ArgSchema::new().positionals(1);
    let Some(bound) = bind(ctx, &schema, args).await? else {
        return Ok(());
    };

    if !bound.positional(0).eq_ignore_ascii_case("*") {
        return ctx.send_error("ERR full pattern matching not supported").await;
    }
    let keys = ctx.store.keys();
    ctx.send_string_array(&keys).await
}
