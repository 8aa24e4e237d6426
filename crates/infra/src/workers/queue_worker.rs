use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use movierent_events::Subscription;

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(|j| j.is_finished())
    }
}

/// Generic queue consumer loop.
///
/// - Drains a bus subscription on a dedicated thread
/// - Hands each message to a handler, then acks it on the subscription;
///   handler errors are logged and the message is not retried
/// - Stops on shutdown request or when the bus goes away
#[derive(Debug)]
pub struct QueueWorker;

impl QueueWorker {
    pub fn spawn<M, H, E>(name: &'static str, sub: Subscription<M>, mut handler: H) -> std::io::Result<WorkerHandle>
    where
        M: Send + 'static,
        H: FnMut(M) -> Result<(), E> + Send + 'static,
        E: core::fmt::Display + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, sub, shutdown_rx, &mut handler))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop<M, H, E>(name: &'static str, sub: Subscription<M>, shutdown_rx: mpsc::Receiver<()>, handler: &mut H)
where
    H: FnMut(M) -> Result<(), E>,
    E: core::fmt::Display,
{
    let tick = Duration::from_millis(250);
    info!(worker = name, "queue worker started");

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(msg) => {
                if let Err(err) = handler(msg) {
                    warn!(worker = name, error = %err, "queue worker handler failed");
                }
                sub.ack();
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    info!(worker = name, "queue worker stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use movierent_events::{EventBus, InMemoryEventBus, acknowledged};

    use super::*;

    #[test]
    fn processes_messages_until_shutdown() {
        let bus = InMemoryEventBus::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let handle = QueueWorker::spawn("test-worker", bus.subscribe(), move |n: u32| {
            if n == 2 {
                return Err("boom".to_string());
            }
            sink.lock().unwrap().push(n);
            Ok(())
        })
        .unwrap();

        for n in 1..=3 {
            bus.publish(n).unwrap();
        }

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while seen.lock().unwrap().len() < 2 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        handle.shutdown();

        assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
    }

    #[test]
    fn stops_when_bus_is_dropped() {
        let bus = InMemoryEventBus::<u32>::new();
        let handle = QueueWorker::spawn("drop-worker", bus.subscribe(), |_n: u32| Ok::<_, String>(())).unwrap();
        drop(bus);

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !handle.is_finished() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(handle.is_finished());
        handle.shutdown();
    }

    #[test]
    fn acks_only_after_the_handler_returns() {
        let (handoff, sub) = acknowledged::<u32>();
        let handled = Arc::new(Mutex::new(Vec::new()));

        let sink = handled.clone();
        let handle = QueueWorker::spawn("ack-worker", sub, move |n: u32| {
            thread::sleep(Duration::from_millis(50));
            sink.lock().unwrap().push(n);
            if n == 2 {
                Err("send failed".to_string())
            } else {
                Ok(())
            }
        })
        .unwrap();

        for n in 1..=3 {
            assert!(handoff.deliver(n));
            // deliver() returned, so the handler already ran for `n`.
            assert_eq!(handled.lock().unwrap().last(), Some(&n));
        }

        handle.shutdown();
        assert!(!handoff.deliver(4));
        assert_eq!(*handled.lock().unwrap(), vec![1, 2, 3]);
    }
}
