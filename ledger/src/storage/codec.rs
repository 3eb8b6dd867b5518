//! rkyv (de)serialization helpers for stored values and log envelopes.

use anyhow::Result;
use rkyv::api::high::to_bytes_with_alloc;
use rkyv::de::Pool;
use rkyv::rancor::Strategy;
use rkyv::ser::allocator::Arena;
use rkyv::util::AlignedVec;
use rkyv::Archive;

pub fn encode<T>(value: &T) -> Result<AlignedVec>
where
    T: for<'a> rkyv::Serialize<
        rkyv::api::high::HighSerializer<
            AlignedVec,
            rkyv::ser::allocator::ArenaHandle<'a>,
            rkyv::rancor::Error,
        >,
    >,
{
    let mut arena = Arena::new();
    to_bytes_with_alloc::<_, rkyv::rancor::Error>(value, arena.acquire())
        .map_err(|e| anyhow::anyhow!("serialization failed: {:?}", e))
}

pub fn decode<T>(bytes: &[u8]) -> Result<T>
where
    T: Archive,
    T::Archived: rkyv::Deserialize<T, Strategy<Pool, rkyv::rancor::Error>>,
{
    // Copy into an AlignedVec first: bytes handed back by the database (or
    // the consensus log) carry no alignment guarantee.
    let mut aligned: AlignedVec = AlignedVec::new();
    aligned.extend_from_slice(bytes);
    let archived = unsafe { rkyv::access_unchecked::<T::Archived>(&aligned) };
    rkyv::deserialize::<T, rkyv::rancor::Error>(archived)
        .map_err(|e| anyhow::anyhow!("deserialization failed: {:?}", e))
}
