//! Native function creation on a `rusqlite` connection.
//!
//! The engine sees every registered function as a plain scalar function of
//! its `FunctionSpec` arity. Arguments arrive as [`SqliteValue`]s; a body error is
//! reported back to the engine as a SQL function failure whose message is
//! the error's display text.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use rusqlite::functions::Context;
use sqlext_error::{ExtError, Result};
use sqlext_types::SqliteValue;
use tracing::{debug, warn};

use crate::{FunctionSink, FunctionSpec};

/// Collect the call's arguments in position order.
fn collect_args(ctx: &Context<'_>) -> Vec<SqliteValue> {
    (0..ctx.len()).map(|i| SqliteValue::from(ctx.get_raw(i))).collect()
}

impl FunctionSink for rusqlite::Connection {
    fn materialize(&self, spec: &FunctionSpec) -> Result<()> {
        let body = AssertUnwindSafe(Arc::clone(spec.body()));
        let created =
            self.create_scalar_function(spec.name(), spec.arity(), spec.flags(), move |ctx| {
                body.invoke(&collect_args(ctx))
                    .map_err(ExtError::into_engine)
            });
        if let Err(err) = created {
            warn!(name = spec.name(), arity = spec.arity(), error = %err, "engine rejected function");
            return Err(err.into());
        }
        debug!(name = spec.name(), arity = spec.arity(), "function created");
        Ok(())
    }
}
