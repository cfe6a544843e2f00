//! [`Handler`] abstractions.

use std::future::Future;

/// Executable handler.
///
/// Commands, queries, background tasks and database operations are all
/// expressed as [`Handler`]s parametrized by their arguments type, so a
/// single type may handle many different operations.
///
/// # Example
///
/// ```rust
/// # use common::Handler;
/// #
/// struct Gate;
///
/// /// Opens the gate for the provided plate.
/// struct Open(&'static str);
///
/// impl Handler<Open> for Gate {
///     type Ok = bool;
///     type Err = ();
///
///     async fn execute(&self, Open(plate): Open) -> Result<bool, ()> {
///         Ok(!plate.is_empty())
///     }
/// }
/// ```
pub trait Handler<Args = ()> {
    /// Type of a successful result.
    type Ok;

    /// Type of an error.
    type Err;

    /// Executes this [`Handler`] with the provided `args`.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
