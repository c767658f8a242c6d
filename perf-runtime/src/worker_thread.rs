use std::{sync::mpsc, thread};

pub(crate) struct WorkerThread;

impl WorkerThread {
    /// Spawns `f` on a named thread and waits until the thread reports it
    /// started.
    pub(crate) fn spawn<F>(name: &str, f: F) -> Result<thread::JoinHandle<()>, String>
    where
        F: FnOnce() + Send + 'static,
    {
        let (status_tx, status_rx) = mpsc::sync_channel(1);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _ = status_tx.send(());
                f();
            })
            .map_err(|err| format!("Failed to spawn {name} thread: {err}"))?;

        match status_rx.recv() {
            Ok(()) => Ok(handle),
            Err(_) => {
                let _ = handle.join();
                Err(format!("{name} thread failed to report status"))
            }
        }
    }
}
