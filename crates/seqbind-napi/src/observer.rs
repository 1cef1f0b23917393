//! JS functions as progress observers.
//!
//! Engines report from a libuv worker thread. The callback runs on the JS
//! thread through a threadsafe function, and the worker waits for the answer:
//! `false` stops the operation, any other return value continues.
//!
//! The threadsafe function does not call the user's function directly. It
//! calls a native guard bound to it, which runs the callback and turns a
//! thrown exception into a stop. The exception never reaches the threadsafe
//! function's own call path, where it would be raised as uncaught.

use std::sync::mpsc;

use napi::threadsafe_function::{
    ErrorStrategy, ThreadSafeCallContext, ThreadsafeFunction, ThreadsafeFunctionCallMode,
};
use napi::{CallContext, Env, JsFunction, JsUnknown, Status, ValueType};

use seqbind_core::traits::{ObserverChoice, ObserverError, ProgressObserver};

use crate::conversions::error_codes;

/// What the JS callback did with one progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Continue,
    Stop,
    Threw,
}

impl CallbackOutcome {
    /// Only an explicit `false` stops; `undefined` and other values continue.
    pub fn from_returned(value: Option<bool>) -> Self {
        match value {
            Some(false) => Self::Stop,
            _ => Self::Continue,
        }
    }

    /// Numeric form passed from the guard back to the worker.
    pub fn code(self) -> u32 {
        match self {
            Self::Continue => 0,
            Self::Stop => 1,
            Self::Threw => 2,
        }
    }

    /// Unknown codes stop the operation.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Continue,
            1 => Self::Stop,
            _ => Self::Threw,
        }
    }

    pub fn into_result(self) -> Result<(), ObserverError> {
        match self {
            Self::Continue => Ok(()),
            Self::Stop => Err(ObserverError::new("progress callback returned false")),
            Self::Threw => Err(ObserverError::new("progress callback threw")),
        }
    }
}

struct ProgressEvent {
    tag: String,
    primary: u64,
    secondary: u64,
}

/// Native half of the guard: `this` is the user's callback, the trailing
/// three arguments are the event. Never throws for a throwing callback.
fn guarded_call(ctx: CallContext<'_>) -> napi::Result<u32> {
    let callback = ctx.this::<JsFunction>()?;
    // Argument 0 is the error slot of the threadsafe call.
    let args = [
        ctx.get::<JsUnknown>(1)?,
        ctx.get::<JsUnknown>(2)?,
        ctx.get::<JsUnknown>(3)?,
    ];
    let outcome = match callback.call(None, &args) {
        Ok(ret) => match ret.get_type()? {
            ValueType::Boolean => {
                CallbackOutcome::from_returned(Some(ret.coerce_to_bool()?.get_value()?))
            }
            _ => CallbackOutcome::from_returned(None),
        },
        Err(e) => {
            tracing::warn!(error = %e, "progress callback threw");
            CallbackOutcome::Threw
        }
    };
    Ok(outcome.code())
}

/// `guarded_call` bound to `callback`.
fn guard(env: &Env, callback: JsFunction) -> napi::Result<JsFunction> {
    let native = env.create_function_from_closure("seqbindProgressGuard", guarded_call)?;
    let receiver = native.coerce_to_object()?;
    let bind: JsFunction = receiver.get_named_property("bind")?;
    let bound = bind.call(Some(&receiver), &[callback])?;
    JsFunction::try_from(bound)
}

pub struct JsProgressObserver {
    callback: ThreadsafeFunction<ProgressEvent, ErrorStrategy::CalleeHandled>,
}

impl JsProgressObserver {
    /// Wrap `callback(tag, primary, secondary)`.
    pub fn new(env: &Env, callback: JsFunction) -> napi::Result<Self> {
        let guarded = guard(env, callback)?;
        let callback: ThreadsafeFunction<ProgressEvent, ErrorStrategy::CalleeHandled> = guarded
            .create_threadsafe_function(0, |ctx: ThreadSafeCallContext<ProgressEvent>| {
                let tag = ctx.env.create_string(&ctx.value.tag)?;
                let primary = ctx.env.create_double(ctx.value.primary as f64)?;
                let secondary = ctx.env.create_double(ctx.value.secondary as f64)?;
                Ok(vec![
                    tag.into_unknown(),
                    primary.into_unknown(),
                    secondary.into_unknown(),
                ])
            })?;
        Ok(Self { callback })
    }

    /// Stop this observer from keeping the event loop alive. Used for the
    /// process default, which outlives any single call.
    pub fn unref(mut self, env: &Env) -> napi::Result<Self> {
        self.callback.unref(env)?;
        Ok(self)
    }
}

impl ProgressObserver for JsProgressObserver {
    fn on_progress(&self, tag: &str, primary: u64, secondary: u64) -> Result<(), ObserverError> {
        let (tx, rx) = mpsc::channel();
        let event = ProgressEvent {
            tag: tag.to_string(),
            primary,
            secondary,
        };
        let status = self.callback.call_with_return_value(
            Ok(event),
            ThreadsafeFunctionCallMode::Blocking,
            move |code: u32| {
                let _ = tx.send(CallbackOutcome::from_code(code));
                Ok(())
            },
        );
        if status != Status::Ok {
            return Err(ObserverError::new(format!(
                "progress callback could not be queued: {status}"
            )));
        }
        match rx.recv() {
            Ok(outcome) => outcome.into_result(),
            Err(_) => Err(ObserverError::new("progress callback did not answer")),
        }
    }
}

/// Per-call observer argument: `undefined` uses the process default, `null`
/// suppresses observation, a function observes this call only.
///
/// Taken as `JsUnknown` rather than `Option` so `null` and `undefined` stay
/// distinct; an omitted argument arrives as `undefined`.
pub fn observer_choice(env: &Env, value: JsUnknown) -> napi::Result<ObserverChoice> {
    match value.get_type()? {
        ValueType::Undefined => Ok(ObserverChoice::Default),
        ValueType::Null => Ok(ObserverChoice::Suppressed),
        ValueType::Function => {
            let callback = JsFunction::try_from(value)?;
            let observer = JsProgressObserver::new(env, callback)?;
            Ok(ObserverChoice::Explicit(std::sync::Arc::new(observer)))
        }
        other => Err(error_codes::invalid_argument(format!(
            "progress observer must be a function, null or undefined, got {other:?}"
        ))),
    }
}
