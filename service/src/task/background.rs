//! Background environment for running [`Task`]s.

use std::{
    error::Error,
    future::{Future, IntoFuture},
};

use futures::{
    future::{self, LocalBoxFuture},
    FutureExt as _, TryFutureExt as _,
};
use tokio::task;
use tracing as log;

#[cfg(doc)]
use crate::Task;

/// Type-erased error of a failed [`Task`].
pub type TaskError = Box<dyn Error + 'static>;

/// Background environment for running long-living [`Task`]s next to the
/// application.
///
/// [`Task`]s are spawned locally, so they don't have to be [`Send`]. Awaiting
/// the [`Background`] drives all of them and resolves with the first failure.
#[derive(Debug, Default)]
pub struct Background {
    /// Local set the [`Task`]s are spawned onto.
    set: task::LocalSet,

    /// Names and handles of the spawned [`Task`]s.
    tasks: Vec<(&'static str, task::JoinHandle<Result<(), TaskError>>)>,
}

impl Background {
    /// Spawns a new named [`Task`] inside this [`Background`] environment.
    pub fn spawn<F, E>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Error + 'static,
    {
        log::debug!("spawning `{name}` background task");
        let handle = self.set.spawn_local(future.map_err(move |e| {
            log::error!("`{name}` background task failed: {e}");
            TaskError::from(Box::new(e))
        }));
        self.tasks.push((name, handle));
    }

    /// Returns the number of spawned [`Task`]s.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Indicates whether no [`Task`]s were spawned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl IntoFuture for Background {
    type Output = Result<(), TaskError>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { set, tasks } = self;
        let joined = tasks.into_iter().map(|(name, handle)| {
            handle
                .map(move |res| {
                    res.unwrap_or_else(|e| {
                        log::error!("`{name}` background task panicked: {e}");
                        Err(TaskError::from(Box::new(e)))
                    })
                })
                .boxed_local()
        });
        future::try_join_all(
            [set.map(Ok).boxed_local()].into_iter().chain(joined),
        )
        .map_ok(drop)
        .boxed_local()
    }
}

#[cfg(test)]
mod spec {
    use std::fmt;

    use super::Background;

    #[derive(Debug)]
    struct Failure;

    impl fmt::Display for Failure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("failure")
        }
    }

    impl std::error::Error for Failure {}

    #[tokio::test]
    async fn resolves_with_first_failure() {
        let mut bg = Background::default();
        assert!(bg.is_empty());

        bg.spawn("ok", async { Ok::<_, Failure>(()) });
        bg.spawn("failing", async { Err(Failure) });
        assert_eq!(bg.len(), 2);

        let err = bg.await.unwrap_err();
        assert_eq!(err.to_string(), "failure");
    }

    #[tokio::test]
    async fn resolves_once_all_finished() {
        let mut bg = Background::default();
        bg.spawn("first", async { Ok::<_, Failure>(()) });
        bg.spawn("second", async { Ok::<_, Failure>(()) });

        assert!(bg.await.is_ok());
    }
}
