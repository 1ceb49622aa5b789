//! The resolution procedure: given a candidate outcome for a derived
//! container, classify it and apply the final disposition.
//!
//! The classification order is the contract: own handle, then container,
//! then thenable, then plain value. Each branch settles the target at most
//! once, and a misbehaving thenable (calls both callbacks, calls one twice,
//! raises after deciding) is reduced to its first decision.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::Error;
use crate::promise::{Promise, Reaction};
use crate::value::{SettleFn, ThenFn, ThenProbe, Value};

/// Decides the disposition of `target` given candidate outcome `x`.
///
/// Invoked from reaction completion and, recursively, from thenable
/// unwrapping. Never runs user code while holding any cell lock.
pub(crate) fn resolve(target: &Promise, x: Value) {
    trace!(candidate = x.kind(), "resolving candidate");
    match x {
        Value::Promise(other) => {
            if other.ptr_eq(target) {
                debug!("candidate is the container being resolved");
                target.producer().reject(Error::ChainingCycle);
                return;
            }
            let producer = target.producer();
            if other.state().is_settled() {
                // Already decided: adopt the outcome through the ordinary
                // capabilities, keeping its deferred dispatch.
                let fulfil: Reaction = {
                    let producer = producer.clone();
                    Box::new(move |v| producer.fulfill(v))
                };
                let reject: Reaction = Box::new(move |r| producer.reject(r));
                other.observe(fulfil, reject);
            } else {
                // Still pending: whatever it fulfills with goes through the
                // procedure again; a rejection is taken as-is.
                let rerun: Reaction = {
                    let target = target.clone();
                    Box::new(move |v| resolve(&target, v))
                };
                let reject: Reaction = Box::new(move |r| producer.reject(r));
                other.observe(rerun, reject);
            }
        }
        Value::Object(obj) => match obj.then_member() {
            Err(raised) => {
                trace!(origin = "thenable-read", reason = %raised, "reading `then` raised");
                target.producer().reject(raised);
            }
            Ok(ThenProbe::Callable(then)) => call_thenable(target, then),
            Ok(ThenProbe::Uncallable | ThenProbe::Absent) => {
                target.producer().fulfill(Value::Object(obj));
            }
        },
        plain => target.producer().fulfill(plain),
    }
}

/// Invokes a thenable's `then` with a freshly guarded callback pair. The
/// guard is shared by the resolve callback, the reject callback, and the
/// raise path of the call itself: the first to claim it decides the target,
/// everything after is a silent no-op.
fn call_thenable(target: &Promise, then: ThenFn) {
    let decided = Arc::new(AtomicBool::new(false));

    let on_value: SettleFn = {
        let target = target.clone();
        let decided = decided.clone();
        Box::new(move |y: Value| {
            if decided.swap(true, Ordering::SeqCst) {
                trace!("late resolve from thenable ignored");
                return;
            }
            resolve(&target, y);
        })
    };
    let on_reason: SettleFn = {
        let target = target.clone();
        let decided = decided.clone();
        Box::new(move |reason: Value| {
            if decided.swap(true, Ordering::SeqCst) {
                trace!("late reject from thenable ignored");
                return;
            }
            target.producer().reject(reason);
        })
    };

    if let Err(raised) = (*then)(on_value, on_reason) {
        if !decided.swap(true, Ordering::SeqCst) {
            trace!(origin = "thenable-call", reason = %raised, "`then` raised before deciding");
            target.producer().reject(raised);
        }
    }
}
