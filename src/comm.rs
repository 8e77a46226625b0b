//! Message passing between ranks that share no memory.
//!
//! Every rank owns one `Comm` endpoint: a mailbox it receives from and a
//! sender to every other rank's mailbox. Mailboxes are rendezvous channels,
//! so a send does not complete until the receiving rank takes the message
//! (synchronous-mode semantics). Collectives are built from point-to-point
//! messages with rank 0 as the hub.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

use crate::error::GapError;
use crate::tracker::GapRecord;

/// Capacity of each mailbox. Zero makes every send a rendezvous.
const MAILBOX_DEPTH: usize = 0;

const HUB: usize = 0;

/// Element-wise combination used by `all_reduce`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Max,
    Min,
    Sum,
    Or,
}

impl ReduceOp {
    pub fn identity(self) -> u64 {
        match self {
            ReduceOp::Max | ReduceOp::Sum | ReduceOp::Or => 0,
            ReduceOp::Min => u64::MAX,
        }
    }

    pub fn combine(self, a: u64, b: u64) -> u64 {
        match self {
            ReduceOp::Max => a.max(b),
            ReduceOp::Min => a.min(b),
            ReduceOp::Sum => a.wrapping_add(b),
            ReduceOp::Or => u64::from(a != 0 || b != 0),
        }
    }

    pub fn apply(self, values: &[u64]) -> u64 {
        values
            .iter()
            .fold(self.identity(), |acc, &v| self.combine(acc, v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Exchange,
    ReduceUp,
    ReduceDown,
    Broadcast,
}

/// Message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    Word(u64),
    Prime(Option<usize>),
    Record(GapRecord),
}

#[derive(Debug)]
struct Envelope {
    source: usize,
    tag: Tag,
    payload: Payload,
}

pub struct Comm {
    rank: usize,
    size: usize,
    // No sender to our own inbox, so `recv` fails once every peer is gone.
    peers: Vec<Option<SyncSender<Envelope>>>,
    inbox: Receiver<Envelope>,
    // Arrived before anyone asked for them.
    parked: VecDeque<Envelope>,
}

/// Wire up `size` endpoints, one per rank, in rank order.
pub fn universe(size: usize) -> Vec<Comm> {
    let (senders, inboxes): (Vec<_>, Vec<_>) =
        (0..size).map(|_| sync_channel(MAILBOX_DEPTH)).unzip();

    inboxes
        .into_iter()
        .enumerate()
        .map(|(rank, inbox)| Comm {
            rank,
            size,
            peers: senders
                .iter()
                .enumerate()
                .map(|(dest, tx)| (dest != rank).then(|| tx.clone()))
                .collect(),
            inbox,
            parked: VecDeque::new(),
        })
        .collect()
}

impl Comm {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn send(&self, dest: usize, tag: Tag, payload: Payload) -> Result<(), GapError> {
        let envelope = Envelope {
            source: self.rank,
            tag,
            payload,
        };
        let Some(peer) = self.peers.get(dest).and_then(Option::as_ref) else {
            return Err(GapError::Disconnected { rank: dest });
        };
        peer.send(envelope).map_err(|_| GapError::Disconnected { rank: dest })
    }

    /// Block until a message from `source` with `tag` arrives. Anything else
    /// that shows up first is parked for a later `recv`.
    fn recv(&mut self, source: usize, tag: Tag) -> Result<Payload, GapError> {
        if let Some(pos) = self
            .parked
            .iter()
            .position(|e| e.source == source && e.tag == tag)
        {
            if let Some(envelope) = self.parked.remove(pos) {
                return Ok(envelope.payload);
            }
        }

        loop {
            let envelope = self
                .inbox
                .recv()
                .map_err(|_| GapError::Disconnected { rank: source })?;
            if envelope.source == source && envelope.tag == tag {
                return Ok(envelope.payload);
            }
            self.parked.push_back(envelope);
        }
    }

    fn recv_word(&mut self, source: usize, tag: Tag) -> Result<u64, GapError> {
        match self.recv(source, tag)? {
            Payload::Word(value) => Ok(value),
            other => Err(self.unexpected(source, other)),
        }
    }

    fn unexpected(&self, source: usize, payload: Payload) -> GapError {
        tracing::error!(
            "rank {} got unexpected {:?} from rank {}",
            self.rank,
            payload,
            source
        );
        GapError::UnexpectedMessage { rank: source }
    }

    /// Every rank contributes `value`; every rank gets `op` over all of them.
    pub fn all_reduce(&mut self, value: u64, op: ReduceOp) -> Result<u64, GapError> {
        if self.rank == HUB {
            let mut acc = value;
            for source in 1..self.size {
                let v = self.recv_word(source, Tag::ReduceUp)?;
                acc = op.combine(acc, v);
            }
            for dest in 1..self.size {
                self.send(dest, Tag::ReduceDown, Payload::Word(acc))?;
            }
            Ok(acc)
        } else {
            self.send(HUB, Tag::ReduceUp, Payload::Word(value))?;
            self.recv_word(HUB, Tag::ReduceDown)
        }
    }

    /// `root` passes `Some(payload)`; every rank returns root's payload.
    pub fn broadcast(&mut self, root: usize, payload: Option<Payload>) -> Result<Payload, GapError> {
        if self.rank == root {
            let Some(payload) = payload else {
                return Err(GapError::UnexpectedMessage { rank: root });
            };
            for dest in (0..self.size).filter(|&d| d != root) {
                self.send(dest, Tag::Broadcast, payload)?;
            }
            Ok(payload)
        } else {
            self.recv(root, Tag::Broadcast)
        }
    }

    pub fn barrier(&mut self) -> Result<(), GapError> {
        self.all_reduce(0, ReduceOp::Sum).map(|_| ())
    }

    /// Send `payload` to rank - 1 and return what rank + 1 sent (`None` on the
    /// last rank).
    ///
    /// Even ranks receive first and odd ranks send first, so each send meets
    /// a receive that is already posted or about to be, and the exchange
    /// finishes in two phases rather than as a chain along the ranks.
    pub fn exchange_leftward(&mut self, payload: Payload) -> Result<Option<Payload>, GapError> {
        let has_left = self.rank > 0;
        let has_right = self.rank + 1 < self.size;
        let mut received = None;

        if self.rank % 2 == 0 {
            if has_right {
                received = Some(self.recv(self.rank + 1, Tag::Exchange)?);
            }
            if has_left {
                self.send(self.rank - 1, Tag::Exchange, payload)?;
            }
        } else {
            if has_left {
                self.send(self.rank - 1, Tag::Exchange, payload)?;
            }
            if has_right {
                received = Some(self.recv(self.rank + 1, Tag::Exchange)?);
            }
        }

        Ok(received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    /// Run `body` on every rank of a fresh universe and collect the results in
    /// rank order.
    fn run_ranks<T, F>(size: usize, body: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&mut Comm) -> T + Sync,
    {
        let body = &body;
        thread::scope(|scope| {
            let handles: Vec<_> = universe(size)
                .into_iter()
                .map(|mut comm| scope.spawn(move || body(&mut comm)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect()
        })
    }

    #[test]
    fn test_reduce_ops() {
        assert_eq!(ReduceOp::Max.apply(&[3, 9, 1]), 9);
        assert_eq!(ReduceOp::Min.apply(&[3, 9, 1]), 1);
        assert_eq!(ReduceOp::Sum.apply(&[3, 9, 1]), 13);
        assert_eq!(ReduceOp::Or.apply(&[0, 0, 0]), 0);
        assert_eq!(ReduceOp::Or.apply(&[0, 7, 0]), 1);
        assert_eq!(ReduceOp::Min.apply(&[]), u64::MAX);
    }

    #[test]
    fn test_all_reduce_agrees_on_every_rank() {
        let results = run_ranks(5, |comm| {
            let rank = comm.rank() as u64;
            let max = comm.all_reduce(rank * 10, ReduceOp::Max).unwrap();
            let sum = comm.all_reduce(rank, ReduceOp::Sum).unwrap();
            let any = comm.all_reduce(u64::from(rank == 3), ReduceOp::Or).unwrap();
            (max, sum, any)
        });
        assert!(results.iter().all(|&r| r == (40, 10, 1)));
    }

    #[test]
    fn test_broadcast_from_any_root() {
        for root in 0..4 {
            let results = run_ranks(4, |comm| {
                let mine = (comm.rank() == root).then(|| Payload::Word(100 + root as u64));
                comm.broadcast(root, mine).unwrap()
            });
            assert!(results.iter().all(|&p| p == Payload::Word(100 + root as u64)));
        }
    }

    #[test]
    fn test_exchange_leftward() {
        for size in [2, 3, 6, 7] {
            let results = run_ranks(size, |comm| {
                let rank = comm.rank();
                comm.exchange_leftward(Payload::Prime(Some(rank * 100))).unwrap()
            });
            for (rank, received) in results.iter().enumerate() {
                if rank + 1 < size {
                    assert_eq!(*received, Some(Payload::Prime(Some((rank + 1) * 100))));
                } else {
                    assert_eq!(*received, None);
                }
            }
        }
    }

    #[test]
    fn test_departed_peer_fails_instead_of_hanging() {
        let mut comms = universe(2);
        let peer = comms.pop().unwrap();
        let mut hub = comms.pop().unwrap();
        drop(peer);

        assert_eq!(
            hub.all_reduce(1, ReduceOp::Sum),
            Err(GapError::Disconnected { rank: 1 })
        );
    }

    #[test]
    fn test_departed_peer_fails_the_sender() {
        let mut comms = universe(2);
        let mut peer = comms.pop().unwrap();
        drop(comms);

        assert_eq!(
            peer.all_reduce(1, ReduceOp::Sum),
            Err(GapError::Disconnected { rank: 0 })
        );
    }

    #[test]
    fn test_interleaved_collectives_and_exchange() {
        let results = run_ranks(6, |comm| {
            let mut seen = Vec::new();
            for round in 0..4u64 {
                let right = comm.exchange_leftward(Payload::Word(round)).unwrap();
                comm.barrier().unwrap();
                let total = comm.all_reduce(round, ReduceOp::Sum).unwrap();
                seen.push((right, total));
            }
            seen
        });
        for (rank, seen) in results.iter().enumerate() {
            for (round, &(right, total)) in seen.iter().enumerate() {
                let round = round as u64;
                assert_eq!(total, round * 6);
                let expected = (rank < 5).then_some(Payload::Word(round));
                assert_eq!(right, expected);
            }
        }
    }
}
