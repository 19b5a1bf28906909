//! Incremental checksum recomputation over streamed content.
//!
//! Objects can be large; the stream is consumed chunk by chunk and never
//! buffered whole in memory.

use bytes::Bytes;
use fedscan_client::{Checksum, ChecksumAlgorithm};
use futures_util::{Stream, StreamExt};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

enum Hasher {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Hasher {
    fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Md5 => Self::Md5(Md5::new()),
            ChecksumAlgorithm::Sha1 => Self::Sha1(Sha1::new()),
            ChecksumAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            ChecksumAlgorithm::Sha512 => Self::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        match self {
            Self::Md5(h) => h.update(chunk),
            Self::Sha1(h) => h.update(chunk),
            Self::Sha256(h) => h.update(chunk),
            Self::Sha512(h) => h.update(chunk),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Md5(h) => hex::encode(h.finalize()),
            Self::Sha1(h) => hex::encode(h.finalize()),
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

/// Recompute a checksum from a byte stream using the given algorithm.
///
/// The algorithm is fixed by the caller (once per audit) so the recomputed
/// digest is comparable to the declared one.
pub async fn digest_stream<S, E>(
    algorithm: ChecksumAlgorithm,
    stream: S,
) -> Result<Checksum, E>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let mut hasher = Hasher::new(algorithm);
    futures_util::pin_mut!(stream);
    while let Some(chunk) = stream.next().await {
        hasher.update(&chunk?);
    }
    Ok(Checksum::new(algorithm, hasher.finalize_hex()))
}
