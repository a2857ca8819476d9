use std::{io, thread};

/// Run `f` in the background without waiting for it.
///
/// Prefers the Tokio blocking pool when the `tokio` feature is on and a runtime is current,
/// the Smol blocking pool with the `smol` feature, and a detached named thread otherwise.
/// If the work cannot be scheduled, `f` is dropped unrun.
pub(crate) fn spawn_detached<F>(name: &str, f: F) -> io::Result<()>
where
    F: FnOnce() + Send + 'static,
{
    let f = match spawn_on_tokio(f) {
        Ok(()) => return Ok(()),
        Err(f) => f,
    };

    spawn_on_smol_or_thread(name, f)
}

#[cfg(feature = "tokio")]
fn spawn_on_tokio<F>(f: F) -> Result<(), F>
where
    F: FnOnce() + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            drop(handle.spawn_blocking(f));
            Ok(())
        }
        Err(_) => Err(f),
    }
}

#[cfg(not(feature = "tokio"))]
fn spawn_on_tokio<F>(f: F) -> Result<(), F>
where
    F: FnOnce() + Send + 'static,
{
    Err(f)
}

#[cfg(all(feature = "smol", not(feature = "tokio")))]
fn spawn_on_smol_or_thread<F>(_name: &str, f: F) -> io::Result<()>
where
    F: FnOnce() + Send + 'static,
{
    smol::unblock(f).detach();
    Ok(())
}

#[cfg(not(all(feature = "smol", not(feature = "tokio"))))]
fn spawn_on_smol_or_thread<F>(name: &str, f: F) -> io::Result<()>
where
    F: FnOnce() + Send + 'static,
{
    spawn_thread(name, f).map(drop)
}

/// Spawn a named OS thread.
pub(crate) fn spawn_thread<F>(name: &str, f: F) -> io::Result<thread::JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new().name(name.to_string()).spawn(f)
}
