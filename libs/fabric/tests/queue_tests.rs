use std::pin::pin;
use std::time::Duration;

use conveyor_fabric::{AsyncQueue, Dequeue, Error, QueueConfig};
use futures::{stream, StreamExt, TryStreamExt};
use tokio::time::sleep;

const WORDS: [&str; 4] = ["hey", "ho", "let's", "go"];

fn enqueue_all<T>(queue: &AsyncQueue<T>, values: impl IntoIterator<Item = T>) {
    for value in values {
        queue.enqueue(value).unwrap();
    }
}

#[tokio::test]
async fn iterates_values_enqueued_before_consumption() {
    let queue = AsyncQueue::new();
    enqueue_all(&queue, WORDS);
    queue.flush().unwrap();

    let results: Vec<&str> = queue.stream().try_collect().await.unwrap();

    assert_eq!(results, WORDS);
}

#[tokio::test]
async fn iterates_values_enqueued_after_consumption_starts() {
    let queue = AsyncQueue::new();

    let producer = async {
        sleep(Duration::from_millis(10)).await;
        enqueue_all(&queue, WORDS);
        queue.flush().unwrap();
    };
    let consumer = queue.stream().try_collect::<Vec<_>>();

    let ((), results) = tokio::join!(producer, consumer);

    assert_eq!(results.unwrap(), WORDS);
}

#[tokio::test]
async fn flush_separates_sessions() {
    let queue = AsyncQueue::new();
    enqueue_all(&queue, ["all", "work", "and", "no", "play"]);
    queue.flush().unwrap();
    enqueue_all(&queue, ["makes", "jack", "a", "dull", "boy"]);
    queue.flush().unwrap();

    let first: Vec<&str> = queue.stream().try_collect().await.unwrap();
    let second: Vec<&str> = queue.stream().try_collect().await.unwrap();

    assert_eq!(first, ["all", "work", "and", "no", "play"]);
    assert_eq!(second, ["makes", "jack", "a", "dull", "boy"]);
}

#[tokio::test]
async fn queue_is_reusable_after_a_consumed_session() {
    let queue = AsyncQueue::new();
    enqueue_all(&queue, ["a", "b"]);
    queue.flush().unwrap();

    let first: Vec<&str> = queue.stream().try_collect().await.unwrap();

    enqueue_all(&queue, ["c", "d"]);
    queue.flush().unwrap();
    let second: Vec<&str> = queue.stream().try_collect().await.unwrap();

    assert_eq!(first, ["a", "b"]);
    assert_eq!(second, ["c", "d"]);
}

#[tokio::test]
async fn dequeue_fails_with_end_of_session_after_flush() {
    let queue = AsyncQueue::new();
    enqueue_all(&queue, WORDS);
    queue.flush().unwrap();

    let mut results = Vec::new();
    for _ in 0..WORDS.len() {
        results.push(queue.dequeue().await.unwrap());
    }

    assert_eq!(results, WORDS);
    assert_eq!(queue.dequeue().await, Err(Error::EndOfSession));
}

#[tokio::test]
async fn dequeue_then_iterate_keeps_order() {
    let queue = AsyncQueue::new();
    enqueue_all(&queue, WORDS);
    queue.flush().unwrap();

    let mut results = vec![
        queue.dequeue().await.unwrap(),
        queue.dequeue().await.unwrap(),
    ];
    let rest: Vec<&str> = queue.stream().try_collect().await.unwrap();
    results.extend(rest);

    assert_eq!(results, WORDS);
}

#[tokio::test]
async fn from_stream_drains_source_and_flushes() {
    let source = stream::iter(vec!["hey", "ho"])
        .chain(stream::once(async {
            sleep(Duration::from_millis(10)).await;
            "let's"
        }))
        .chain(stream::iter(vec!["go"]));

    let queue = AsyncQueue::from_stream(source);
    let results: Vec<&str> = queue.stream().try_collect().await.unwrap();

    assert_eq!(results, WORDS);
}

#[tokio::test]
async fn into_stream_owns_the_handle() {
    let queue = AsyncQueue::from_stream(stream::iter(1..=3));

    let results: Vec<u32> = queue.into_stream().try_collect().await.unwrap();

    assert_eq!(results, [1, 2, 3]);
}

#[test]
fn enqueue_beyond_max_size_fails() {
    let queue = AsyncQueue::new();
    queue.set_max_size(4);

    enqueue_all(&queue, WORDS);

    assert_eq!(
        queue.enqueue("too far"),
        Err(Error::CapacityExceeded { max_size: 4 })
    );
    assert_eq!(queue.len(), 4);
}

#[test]
fn flush_counts_against_max_size() {
    let queue = AsyncQueue::builder().max_size(2).build();
    enqueue_all(&queue, ["a", "b"]);

    assert_eq!(queue.flush(), Err(Error::CapacityExceeded { max_size: 2 }));
}

#[test]
fn zero_max_size_is_unbounded() {
    let queue = AsyncQueue::new();

    enqueue_all(&queue, 0..10_000);

    assert_eq!(queue.max_size(), 0);
    assert_eq!(queue.len(), 10_000);
}

#[tokio::test]
async fn delivered_slots_free_capacity() {
    let queue = AsyncQueue::new();
    queue.set_max_size(1);
    queue.enqueue(1).unwrap();
    assert!(queue.enqueue(2).is_err());

    assert_eq!(queue.dequeue().await.unwrap(), 1);
    queue.enqueue(2).unwrap();

    assert_eq!(queue.dequeue().await.unwrap(), 2);
    assert!(queue.is_empty());
}

#[tokio::test(start_paused = true)]
async fn iteration_fails_when_wait_exceeds_max_wait_time() {
    let queue = AsyncQueue::new();
    queue.set_max_wait_time(Duration::from_millis(10));

    let producer = async {
        queue.enqueue("hey").unwrap();
        sleep(Duration::from_millis(5)).await;
        queue.enqueue("ho").unwrap();
        sleep(Duration::from_millis(20)).await;
        enqueue_all(&queue, ["let's", "go"]);
        queue.flush().unwrap();
    };
    let consumer = async {
        let mut results = Vec::new();
        let mut values = pin!(queue.stream());
        while let Some(value) = values.next().await {
            match value {
                Ok(value) => results.push(value),
                Err(err) => return (results, Some(err)),
            }
        }
        (results, None)
    };

    let ((), (results, failure)) = tokio::join!(producer, consumer);

    assert_eq!(results, ["hey", "ho"]);
    assert_eq!(failure, Some(Error::Timeout(Duration::from_millis(10))));
}

#[tokio::test(start_paused = true)]
async fn dequeue_times_out_without_a_slot() {
    let queue: AsyncQueue<&str> = AsyncQueue::builder()
        .max_wait_time(Duration::from_millis(10))
        .build();

    assert_eq!(
        queue.dequeue().await,
        Err(Error::Timeout(Duration::from_millis(10)))
    );
}

#[tokio::test(start_paused = true)]
async fn enqueue_within_max_wait_time_resolves_dequeue() {
    let queue = AsyncQueue::new();
    queue.set_max_wait_time(Duration::from_millis(10));

    let producer = async {
        sleep(Duration::from_millis(5)).await;
        queue.enqueue("in time").unwrap();
    };

    let ((), value) = tokio::join!(producer, queue.dequeue());

    assert_eq!(value, Ok("in time"));
}

#[tokio::test(start_paused = true)]
async fn late_slot_is_delivered_to_the_next_dequeue() {
    let queue = AsyncQueue::new();
    queue.set_max_wait_time(Duration::from_millis(10));

    assert!(matches!(queue.dequeue().await, Err(Error::Timeout(_))));

    queue.enqueue("late").unwrap();

    assert_eq!(queue.dequeue().await, Ok("late"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_dequeuers_share_fifo_order() {
    const CONSUMERS: usize = 4;
    const VALUES: u32 = 200;

    let queue = AsyncQueue::new();
    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let queue = queue.clone();
            tokio::spawn(async move { queue.stream().try_collect::<Vec<u32>>().await })
        })
        .collect();

    sleep(Duration::from_millis(10)).await;
    enqueue_all(&queue, 0..VALUES);
    for _ in 0..CONSUMERS {
        queue.flush().unwrap();
    }

    let mut all = Vec::new();
    for consumer in consumers {
        let received = consumer.await.unwrap().unwrap();
        assert!(received.windows(2).all(|pair| pair[0] < pair[1]));
        all.extend(received);
    }
    all.sort_unstable();

    assert_eq!(all, (0..VALUES).collect::<Vec<_>>());
}

#[test]
fn builder_and_setters_update_config() {
    let queue: AsyncQueue<()> = AsyncQueue::builder()
        .max_size(8)
        .max_wait_time(Duration::from_millis(250))
        .build();

    assert_eq!(
        queue.config(),
        QueueConfig {
            max_size: 8,
            max_wait_time: Duration::from_millis(250),
        }
    );

    queue.set_max_size(0);
    queue.set_max_wait_time(Duration::ZERO);

    assert_eq!(queue.config(), QueueConfig::default());
    assert_eq!(queue.config().wait_limit(), None);
}

#[test]
fn enqueue_and_flush_is_all_or_nothing() {
    let queue = AsyncQueue::builder().max_size(2).build();
    queue.enqueue("a").unwrap();

    assert_eq!(
        queue.enqueue_and_flush("b"),
        Err(Error::CapacityExceeded { max_size: 2 })
    );
    assert_eq!(queue.len(), 1);

    queue.set_max_size(3);
    queue.enqueue_and_flush("b").unwrap();

    assert_eq!(queue.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn timed_out_dequeues_leave_no_waiters_behind() {
    let queue: AsyncQueue<u32> = AsyncQueue::builder()
        .max_wait_time(Duration::from_millis(1))
        .build();

    for _ in 0..1_000 {
        assert_eq!(
            queue.dequeue().await,
            Err(Error::Timeout(Duration::from_millis(1)))
        );
    }

    assert_eq!(queue.waiting(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_lose_no_slot() {
    const PRODUCERS: u32 = 4;
    const PER_PRODUCER: u32 = 250;

    let queue = AsyncQueue::new();
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let queue = queue.clone();
            tokio::spawn(async move {
                for n in 0..PER_PRODUCER {
                    queue.enqueue((producer, n)).unwrap();
                    if n % 50 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();

    for producer in producers {
        producer.await.unwrap();
    }
    queue.flush().unwrap();

    let received: Vec<(u32, u32)> = queue.stream().try_collect().await.unwrap();

    assert_eq!(received.len(), (PRODUCERS * PER_PRODUCER) as usize);
    for producer in 0..PRODUCERS {
        let own: Vec<u32> = received
            .iter()
            .filter(|(from, _)| *from == producer)
            .map(|(_, n)| *n)
            .collect();
        assert_eq!(own, (0..PER_PRODUCER).collect::<Vec<_>>());
    }
}
