use std::future::Future;
use std::pin::Pin;

pub mod identity;
pub mod push;
pub mod store;
pub mod time;

pub type PortFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;
