//! Capacity-bounded word packets
//!
//! The probe accepts at most a few dozen bytes per command, so a segment's
//! words are cut into [`Packet`]s of at most `max_words` words. Packets never
//! span a segment boundary and words inside a packet are contiguous.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::image::{Segment, Words};

/// Largest word count expressible in the one-byte count field of a frame
pub const MAX_PACKET_WORDS: usize = u8::MAX as usize;

/// Contiguous 16-bit words destined for one transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    address: u32,
    words: Vec<u16>,
    capacity: usize,
}

impl Packet {
    /// Create an empty packet anchored at `address`
    pub fn new(address: u32, capacity: usize) -> Self {
        Self {
            address,
            words: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a word, rejecting it if the packet is full
    pub fn push(&mut self, word: u16) -> Result<()> {
        if self.is_full() {
            return Err(Error::PacketOverflow {
                capacity: self.capacity,
            });
        }
        self.words.push(word);
        Ok(())
    }

    /// Address of the first word
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Address one past the last word
    pub fn end_address(&self) -> u32 {
        self.address + 2 * self.words.len() as u32
    }

    /// Words in address order
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Maximum number of words
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of words
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the packet holds no words
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Whether another word would overflow the packet
    pub fn is_full(&self) -> bool {
        self.words.len() >= self.capacity
    }

    /// `(address, word)` pairs of this packet
    pub fn iter(&self) -> impl Iterator<Item = (u32, u16)> + '_ {
        let base = self.address;
        self.words
            .iter()
            .enumerate()
            .map(move |(i, w)| (base + 2 * i as u32, *w))
    }
}

/// Lazy sequence of packets over one segment
///
/// Created by [`packetize`].
#[derive(Debug, Clone)]
pub struct Packets<'a> {
    words: Words<'a>,
    max_words: usize,
    current: Option<Packet>,
}

impl Iterator for Packets<'_> {
    type Item = Packet;

    fn next(&mut self) -> Option<Packet> {
        for (addr, word) in self.words.by_ref() {
            match self.current.as_mut() {
                Some(pkt) if !pkt.is_full() => pkt.words.push(word),
                _ => {
                    let mut next = Packet::new(addr, self.max_words);
                    next.words.push(word);
                    if let Some(full) = self.current.replace(next) {
                        return Some(full);
                    }
                }
            }
        }
        // Segment exhausted: flush whatever is left, even if partial
        self.current.take()
    }
}

/// Split a segment into packets of at most `max_words` words
///
/// The segment must be word aligned (even start and length) and
/// `max_words` must be in `1..=255`. Concatenating the words of all yielded
/// packets reproduces the segment's word sequence exactly.
pub fn packetize(segment: Segment<'_>, max_words: usize) -> Result<Packets<'_>> {
    segment.check_word_aligned()?;
    if max_words == 0 || max_words > MAX_PACKET_WORDS {
        return Err(Error::InvalidFrameSize(max_words));
    }

    Ok(Packets {
        words: segment.words(),
        max_words,
        current: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::HexImage;
    use alloc::vec;

    fn segment_bytes(words: &[u16]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn test_packet_overflow() {
        let mut pkt = Packet::new(0x1000, 2);
        pkt.push(1).unwrap();
        pkt.push(2).unwrap();
        assert!(pkt.is_full());
        assert_eq!(pkt.push(3), Err(Error::PacketOverflow { capacity: 2 }));
        assert_eq!(pkt.words(), &[1, 2]);
    }

    #[test]
    fn test_eight_words_by_three() {
        let words: Vec<u16> = (0..8).map(|i| 0xA000 + i).collect();
        let bytes = segment_bytes(&words);
        let seg = Segment::new(0x1000, &bytes);

        let pkts: Vec<Packet> = packetize(seg, 3).unwrap().collect();
        assert_eq!(pkts.len(), 3);
        assert_eq!(pkts[0].address(), 0x1000);
        assert_eq!(pkts[0].words(), &words[0..3]);
        assert_eq!(pkts[1].address(), 0x1006);
        assert_eq!(pkts[1].words(), &words[3..6]);
        assert_eq!(pkts[2].address(), 0x100C);
        assert_eq!(pkts[2].words(), &words[6..8]);
    }

    #[test]
    fn test_exact_multiple_has_no_empty_tail() {
        let bytes = segment_bytes(&[1, 2, 3, 4, 5, 6]);
        let pkts: Vec<Packet> = packetize(Segment::new(0, &bytes), 3).unwrap().collect();
        assert_eq!(pkts.len(), 2);
        assert!(pkts.iter().all(|p| p.len() == 3));
    }

    #[test]
    fn test_packets_reproduce_segment() {
        let words: Vec<u16> = (0..100u16).map(|i| i.wrapping_mul(0x0101)).collect();
        let bytes = segment_bytes(&words);
        let seg = Segment::new(0x8000, &bytes);

        for max_words in [1, 2, 7, 29, 99, 100, 255] {
            let pkts: Vec<Packet> = packetize(seg, max_words).unwrap().collect();

            let joined: Vec<(u32, u16)> = pkts.iter().flat_map(|p| p.iter()).collect();
            let expected: Vec<(u32, u16)> = seg.words().collect();
            assert_eq!(joined, expected, "max_words = {}", max_words);

            for pair in pkts.windows(2) {
                assert_eq!(pair[0].end_address(), pair[1].address());
                assert!(pair[0].address() < pair[1].address());
            }
            assert!(pkts.iter().all(|p| !p.is_empty() && p.len() <= max_words));
        }
    }

    #[test]
    fn test_packets_restartable() {
        let bytes = segment_bytes(&[1, 2, 3, 4, 5]);
        let seg = Segment::new(0x200, &bytes);
        let first: Vec<Packet> = packetize(seg, 2).unwrap().collect();
        let second: Vec<Packet> = packetize(seg, 2).unwrap().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_packets_never_span_segments() {
        let image =
            HexImage::from_blocks(vec![(0x1000, vec![0; 4]), (0x1008, vec![0; 4])]).unwrap();
        let pkts: Vec<Packet> = image
            .segments()
            .flat_map(|s| packetize(s, 10).unwrap())
            .collect();
        assert_eq!(pkts.len(), 2);
        assert_eq!(pkts[0].address(), 0x1000);
        assert_eq!(pkts[1].address(), 0x1008);
    }

    #[test]
    fn test_invalid_capacity() {
        let bytes = [0u8; 4];
        let seg = Segment::new(0, &bytes);
        assert!(matches!(packetize(seg, 0), Err(Error::InvalidFrameSize(0))));
        assert!(matches!(packetize(seg, 256), Err(Error::InvalidFrameSize(256))));
    }
}
