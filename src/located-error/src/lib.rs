use std::{fmt::Display, panic::Location};

use anyhow::{Context, Result};

pub mod prelude {
    extern crate anyhow;
    pub use anyhow::{anyhow, bail, ensure, Context, Result};

    extern crate thiserror;
    pub use thiserror::Error;

    pub use super::{LocatedError, LocatedOption};
}

/// Format a caller location as `[file:line:column]`
fn located(caller: &Location<'_>, context: impl Display) -> String {
    format!("[{}:{}:{}] {context}", caller.file(), caller.line(), caller.column())
}

/// Return early with an error, tagged with the location of the macro call.
#[macro_export]
macro_rules! loc {
    ($err:expr) => {
        Err(anyhow::anyhow!($err)).loc("")
    };
}

pub trait LocatedError<T, E> {
    /// Wrap the error value with additional context + the location at which it was called.
    fn loc<C>(self, context: C) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static;

    /// Wrap the error value with additional context that is evaluated lazily
    /// only once an error does occur + the location at which it was called.
    fn with_loc<C, F>(self, f: F) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> LocatedError<T, E> for Result<T, E>
where
    E: Display + Send + Sync + 'static,
    Result<T, E>: Context<T, E>,
{
    #[track_caller]
    fn loc<C>(self, context: C) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static
    {
        let caller = Location::caller();
        self.with_context(|| located(caller, context))
    }

    #[track_caller]
    fn with_loc<C, F>(self, f: F) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C
    {
        let caller = Location::caller();
        self.with_context(|| located(caller, f()))
    }
}

pub trait LocatedOption<T> {
    /// Convert a `None` into an error carrying context + the location at which it was called.
    fn loc<C>(self, context: C) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static;

    /// Lazy counterpart of [`LocatedOption::loc`].
    fn with_loc<C, F>(self, f: F) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> LocatedOption<T> for Option<T> {
    #[track_caller]
    fn loc<C>(self, context: C) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static
    {
        let caller = Location::caller();
        self.with_context(|| located(caller, context))
    }

    #[track_caller]
    fn with_loc<C, F>(self, f: F) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C
    {
        let caller = Location::caller();
        self.with_context(|| located(caller, f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;
    use std::fs::File;

    #[derive(Error, Debug)]
    pub enum MapError {
        #[error(transparent)]
        Io(#[from] anyhow::Error),

        #[error("Malformed genetic map header")]
        Header,
    }

    fn open_map(file: &str) -> Result<(), MapError> {
        let _ = File::open(file).loc(format!("failed to open genetic map: '{file}'"))?;
        Ok(())
    }

    fn load_chromosome() -> Result<()> {
        open_map("missing-dir/male.chr1.CDF.txt").with_loc(|| "While loading chromosome 1")
    }

    fn select_crossover() -> Result<()> {
        load_chromosome().with_loc(|| MapError::Header)
    }

    #[test]
    fn error_chain_carries_every_call_site() {
        let err = select_crossover().expect_err("file should not exist");
        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        assert!(chain.len() >= 3);
        assert!(chain[0].contains("Malformed genetic map header"));
        assert!(chain[1].contains("While loading chromosome 1"));
        assert!(chain[..3].iter().all(|msg| msg.starts_with('[') && msg.contains("lib.rs")));
    }

    #[test]
    fn missing_option_is_located() {
        let none: Option<u32> = None;
        let err = none.loc("no haplotype copy").expect_err("None must become an error");
        let msg = err.to_string();
        assert!(msg.starts_with('['));
        assert!(msg.ends_with("no haplotype copy"));
    }

    #[test]
    fn ok_values_pass_through() -> Result<()> {
        let value: Result<u8, std::io::Error> = Ok(4);
        assert_eq!(value.loc("unused")?, 4);
        assert_eq!(Some(2).with_loc(|| "unused")?, 2);
        Ok(())
    }

    #[test]
    fn loc_macro_builds_an_error() {
        let out: Result<()> = loc!(MapError::Header);
        assert!(out.is_err());
    }
}
