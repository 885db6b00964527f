use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use crate::error::RefreshError;

pub type RefreshResult = Result<(), RefreshError>;
pub type RefreshFuture = Pin<Box<dyn Future<Output = RefreshResult>>>;

/// The caller's refresh work. Invoked once per commit.
pub type RefreshAction = Rc<dyn Fn() -> RefreshFuture>;

/// Wraps an async closure as a [`RefreshAction`].
///
/// ```ignore
/// let action = refresh_action(|| async {
///     reload_feed().await.map_err(|err| RefreshError::new(err.to_string()))
/// });
/// ```
pub fn refresh_action<F, Fut>(action: F) -> RefreshAction
where
    F: Fn() -> Fut + 'static,
    Fut: Future<Output = RefreshResult> + 'static,
{
    Rc::new(move || Box::pin(action()))
}
