//! Type-erased handler invocation.
//!
//! Registration is explicit rather than reflection-based: callers hand a
//! typed closure to [`crate::TaskRegistry::builder`]'s `register`, and
//! [`TypedHandler`] wraps it with the serde codec needed to cross the
//! `serde_json::Value` boundary the registry stores everything behind.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::context::TaskContext;
use crate::error::RegistryError;

/// The error type a handler closure returns on failure.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A handler with its input/output types erased behind JSON values, so the
/// registry can store handlers of differing signatures in one map.
pub trait Handler: Send + Sync {
    fn call(
        &self,
        args: Value,
        ctx: TaskContext,
    ) -> BoxFuture<'static, Result<Value, RegistryError>>;
}

/// Wraps a `Fn(In, TaskContext) -> Future<Output = Result<Out, HandlerError>>`
/// closure with the decode/encode boilerplate needed to implement [`Handler`].
pub struct TypedHandler<F, In, Out, Fut> {
    f: F,
    task_name: String,
    _marker: PhantomData<fn(In) -> (Out, Fut)>,
}

impl<F, In, Out, Fut> TypedHandler<F, In, Out, Fut>
where
    F: Fn(In, TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Out, HandlerError>> + Send + 'static,
    In: DeserializeOwned + Send + 'static,
    Out: Serialize + Send + 'static,
{
    pub fn new(task_name: impl Into<String>, f: F) -> Self {
        Self {
            f,
            task_name: task_name.into(),
            _marker: PhantomData,
        }
    }
}

impl<F, In, Out, Fut> Handler for TypedHandler<F, In, Out, Fut>
where
    F: Fn(In, TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Out, HandlerError>> + Send + 'static,
    In: DeserializeOwned + Send + 'static,
    Out: Serialize + Send + 'static,
{
    fn call(
        &self,
        args: Value,
        ctx: TaskContext,
    ) -> BoxFuture<'static, Result<Value, RegistryError>> {
        let task_name = self.task_name.clone();
        let input = match serde_json::from_value::<In>(args) {
            Ok(input) => input,
            Err(err) => {
                return Box::pin(async move {
                    Err(RegistryError::DecodeInput {
                        task_name,
                        message: err.to_string(),
                    })
                })
            }
        };

        let fut = (self.f)(input, ctx);
        Box::pin(async move {
            let output = fut.await.map_err(|err| RegistryError::HandlerFailed {
                task_name: task_name.clone(),
                message: err.to_string(),
            })?;
            serde_json::to_value(output).map_err(|err| RegistryError::EncodeOutput {
                task_name,
                message: err.to_string(),
            })
        })
    }
}
