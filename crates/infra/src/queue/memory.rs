//! In-memory command queue on tokio channels.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use jobline_core::Command;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use super::{CommandQueue, QueueCapacity, QueueError};

#[derive(Debug)]
enum Tx {
    Unbounded(mpsc::UnboundedSender<Command>),
    Bounded(mpsc::Sender<Command>),
}

#[derive(Debug)]
enum Rx {
    Unbounded(mpsc::UnboundedReceiver<Command>),
    Bounded(mpsc::Receiver<Command>),
}

impl Rx {
    async fn recv(&mut self) -> Option<Command> {
        match self {
            Rx::Unbounded(rx) => rx.recv().await,
            Rx::Bounded(rx) => rx.recv().await,
        }
    }
}

/// In-memory FIFO queue.
///
/// - Producers call `enqueue` from any thread or task
/// - A single consumer awaits `dequeue`; a second concurrent consumer waits
///   for the first to finish its receive
/// - Nothing survives a restart
#[derive(Debug)]
pub struct InMemoryCommandQueue {
    tx: Tx,
    rx: Mutex<Rx>,
    capacity: QueueCapacity,
    depth: AtomicUsize,
}

impl InMemoryCommandQueue {
    pub fn new(capacity: QueueCapacity) -> Self {
        let (tx, rx) = match capacity {
            QueueCapacity::Unbounded => {
                let (tx, rx) = mpsc::unbounded_channel();
                (Tx::Unbounded(tx), Rx::Unbounded(rx))
            }
            QueueCapacity::Bounded(n) => {
                let (tx, rx) = mpsc::channel(n.get());
                (Tx::Bounded(tx), Rx::Bounded(rx))
            }
        };

        Self {
            tx,
            rx: Mutex::new(rx),
            capacity,
            depth: AtomicUsize::new(0),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(QueueCapacity::Unbounded)
    }

    pub fn capacity(&self) -> QueueCapacity {
        self.capacity
    }
}

impl Default for InMemoryCommandQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[async_trait]
impl CommandQueue for InMemoryCommandQueue {
    fn enqueue(&self, command: Command) -> Result<(), QueueError> {
        // Count before sending so a fast consumer never decrements first.
        self.depth.fetch_add(1, Ordering::SeqCst);

        let sent = match &self.tx {
            Tx::Unbounded(tx) => tx.send(command).map_err(|_| QueueError::Closed),
            Tx::Bounded(tx) => tx.try_send(command).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => QueueError::Full {
                    capacity: tx.max_capacity(),
                },
                mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
            }),
        };

        if sent.is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
        }
        sent
    }

    async fn dequeue(&self, shutdown: &CancellationToken) -> Result<Command, QueueError> {
        let mut rx = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(QueueError::Cancelled),
            rx = self.rx.lock() => rx,
        };

        // `recv` is cancel safe: losing the race to shutdown drops no command.
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(QueueError::Cancelled),
            next = rx.recv() => next,
        };

        match next {
            Some(command) => {
                self.depth.fetch_sub(1, Ordering::SeqCst);
                Ok(command)
            }
            None => Err(QueueError::Closed),
        }
    }

    fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::sync::Arc;
    use std::time::Duration;

    use jobline_core::{JobId, SendSms};
    use proptest::prelude::*;

    use super::*;

    fn sms(message: &str) -> Command {
        SendSms {
            job_id: JobId::new(),
            phone_number: "+1000".to_string(),
            message: message.to_string(),
        }
        .into()
    }

    #[tokio::test]
    async fn delivers_in_enqueue_order() {
        let queue = InMemoryCommandQueue::unbounded();
        let shutdown = CancellationToken::new();
        let commands: Vec<_> = (0..5).map(|i| sms(&i.to_string())).collect();

        for c in &commands {
            queue.enqueue(c.clone()).unwrap();
        }
        assert_eq!(queue.len(), 5);

        for expected in &commands {
            assert_eq!(&queue.dequeue(&shutdown).await.unwrap(), expected);
        }
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn dequeue_waits_for_a_producer() {
        let queue = Arc::new(InMemoryCommandQueue::unbounded());
        let shutdown = CancellationToken::new();
        let command = sms("late");

        let producer = {
            let queue = queue.clone();
            let command = command.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                queue.enqueue(command).unwrap();
            })
        };

        let got = tokio::time::timeout(Duration::from_secs(2), queue.dequeue(&shutdown))
            .await
            .expect("dequeue should wake up")
            .unwrap();
        assert_eq!(got, command);
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_blocked_dequeue() {
        let queue = Arc::new(InMemoryCommandQueue::unbounded());
        let shutdown = CancellationToken::new();

        let waiter = {
            let queue = queue.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { queue.dequeue(&shutdown).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("cancelled dequeue should return")
            .unwrap();
        assert_eq!(result, Err(QueueError::Cancelled));
    }

    #[tokio::test]
    async fn cancelled_dequeue_consumes_nothing() {
        let queue = InMemoryCommandQueue::unbounded();
        let command = sms("kept");
        queue.enqueue(command.clone()).unwrap();

        let cancelled = CancellationToken::new();
        cancelled.cancel();
        assert_eq!(queue.dequeue(&cancelled).await, Err(QueueError::Cancelled));
        assert_eq!(queue.len(), 1);

        let live = CancellationToken::new();
        assert_eq!(queue.dequeue(&live).await.unwrap(), command);
    }

    #[tokio::test]
    async fn bounded_queue_rejects_when_full() {
        let capacity = QueueCapacity::Bounded(NonZeroUsize::new(2).unwrap());
        let queue = InMemoryCommandQueue::new(capacity);
        queue.enqueue(sms("1")).unwrap();
        queue.enqueue(sms("2")).unwrap();

        assert_eq!(
            queue.enqueue(sms("3")),
            Err(QueueError::Full { capacity: 2 })
        );
        assert_eq!(queue.len(), 2);

        let shutdown = CancellationToken::new();
        queue.dequeue(&shutdown).await.unwrap();
        assert!(queue.enqueue(sms("4")).is_ok());
    }

    #[test]
    fn zero_limit_means_unbounded() {
        assert_eq!(QueueCapacity::from_limit(0), QueueCapacity::Unbounded);
        assert_eq!(
            QueueCapacity::from_limit(3),
            QueueCapacity::Bounded(NonZeroUsize::new(3).unwrap())
        );
    }

    proptest! {
        /// Property: interleaving producers never reorders what a single
        /// producer sent, and the consumer sees every command exactly once.
        #[test]
        fn fifo_across_producers(batches in prop::collection::vec(1usize..6, 1..5)) {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let queue = Arc::new(InMemoryCommandQueue::unbounded());
                let total: usize = batches.iter().sum();

                let producers: Vec<_> = batches
                    .iter()
                    .enumerate()
                    .map(|(p, &n)| {
                        let queue = queue.clone();
                        tokio::spawn(async move {
                            for i in 0..n {
                                queue.enqueue(sms(&format!("{p}:{i}"))).unwrap();
                                tokio::task::yield_now().await;
                            }
                        })
                    })
                    .collect();

                let shutdown = CancellationToken::new();
                let mut seen: Vec<Vec<usize>> = vec![Vec::new(); batches.len()];
                for _ in 0..total {
                    let Command::SendSms(c) = queue.dequeue(&shutdown).await.unwrap() else {
                        panic!("unexpected command kind");
                    };
                    let (p, i) = c.message.split_once(':').unwrap();
                    seen[p.parse::<usize>().unwrap()].push(i.parse().unwrap());
                }
                for p in producers {
                    p.await.unwrap();
                }

                for (p, &n) in batches.iter().enumerate() {
                    assert_eq!(seen[p], (0..n).collect::<Vec<_>>());
                }
                assert!(queue.is_empty());
            });
        }
    }
}
