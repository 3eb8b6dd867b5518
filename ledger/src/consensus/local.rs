//! Single-voter in-process consensus engine.
//!
//! Stand-in for a real Raft transport in local/demo deployments and tests:
//! with one voter an entry commits the moment it is appended, so `apply`
//! feeds the state machine directly. The node always considers itself
//! leader. Membership calls are tracked so the RPC surface behaves, but no
//! replication happens — a production cluster plugs an actual consensus
//! implementation into [`RaftApi`].

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::consensus::{RaftApi, ServerAddress, ServerId, StateMachine};
use crate::error::Error;

pub struct LocalRaft {
    id: ServerId,
    address: ServerAddress,
    fsm: Box<dyn StateMachine>,
    // The library contract is at most one concurrent apply.
    apply_lock: Mutex<()>,
    membership: Mutex<HashMap<ServerId, ServerAddress>>,
}

impl LocalRaft {
    pub fn new(id: ServerId, address: ServerAddress, fsm: Box<dyn StateMachine>) -> Self {
        let membership = HashMap::from([(id.clone(), address.clone())]);
        Self {
            id,
            address,
            fsm,
            apply_lock: Mutex::new(()),
            membership: Mutex::new(membership),
        }
    }

    pub fn members(&self) -> HashMap<ServerId, ServerAddress> {
        self.membership
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl RaftApi for LocalRaft {
    fn apply(&self, entry: Vec<u8>, _timeout: Duration) -> Result<(), Error> {
        let _serialized = self.apply_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.fsm.apply(&entry)
    }

    fn leader_with_id(&self) -> (ServerAddress, ServerId) {
        (self.address.clone(), self.id.clone())
    }

    fn add_voter(&self, id: ServerId, address: ServerAddress) -> Result<(), Error> {
        self.membership
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, address);
        Ok(())
    }

    fn add_nonvoter(&self, id: ServerId, address: ServerAddress) -> Result<(), Error> {
        self.membership
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, address);
        Ok(())
    }

    fn remove_server(&self, id: ServerId) -> Result<(), Error> {
        let mut members = self.membership.lock().unwrap_or_else(|e| e.into_inner());
        if members.remove(&id).is_none() {
            return Err(Error::NotFound(format!("server {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingFsm {
        applied: Arc<AtomicUsize>,
    }

    impl StateMachine for CountingFsm {
        fn apply(&self, _entry: &[u8]) -> Result<(), Error> {
            self.applied.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn snapshot(&self) -> Result<Vec<u8>, Error> {
            Ok(Vec::new())
        }

        fn restore(&self, _snapshot: &[u8]) -> Result<(), Error> {
            Ok(())
        }
    }

    fn engine(applied: Arc<AtomicUsize>) -> LocalRaft {
        LocalRaft::new(
            ServerId("n1".into()),
            ServerAddress("127.0.0.1:8001".into()),
            Box::new(CountingFsm { applied }),
        )
    }

    #[test]
    fn apply_commits_immediately() {
        let applied = Arc::new(AtomicUsize::new(0));
        let raft = engine(Arc::clone(&applied));
        raft.apply(vec![1, 2, 3], Duration::from_secs(1)).unwrap();
        assert_eq!(applied.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn node_is_its_own_leader() {
        let raft = engine(Arc::new(AtomicUsize::new(0)));
        let (address, id) = raft.leader_with_id();
        assert_eq!(id, ServerId("n1".into()));
        assert_eq!(address, ServerAddress("127.0.0.1:8001".into()));
    }

    #[test]
    fn membership_bookkeeping() {
        let raft = engine(Arc::new(AtomicUsize::new(0)));
        raft.add_voter(
            ServerId("n2".into()),
            ServerAddress("127.0.0.1:8002".into()),
        )
        .unwrap();
        raft.add_nonvoter(
            ServerId("n3".into()),
            ServerAddress("127.0.0.1:8003".into()),
        )
        .unwrap();
        assert_eq!(raft.members().len(), 3);

        raft.remove_server(ServerId("n2".into())).unwrap();
        assert_eq!(raft.members().len(), 2);
        assert!(raft.remove_server(ServerId("n2".into())).is_err());
    }
}
