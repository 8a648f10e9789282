//! Word composition over the raw register transport.
//!
//! Drive parameters wider than one register are stored as 2 or 4
//! consecutive 16-bit registers, least-significant word first. The
//! accessor splits writes and recombines reads so the driver layer only
//! deals in whole values.
//!
//! Writes go to the holding region, reads to the input region, matching
//! the drive's register mirroring.

use crate::error::BusError;
use crate::transport::{RegionKind, SharedTransport};
use tracing::trace;

/// Composes 16/32/64-bit values out of 16-bit register transactions.
///
/// Cheap to clone; every axis driver holds its own accessor over the
/// shared transport.
#[derive(Clone)]
pub struct RegisterAccessor {
    transport: SharedTransport,
}

/// Recombine little-endian register words into one value.
#[inline]
pub fn combine_words(words: &[u16]) -> u64 {
    words
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, &w)| acc | (u64::from(w) << (16 * i)))
}

/// Split a value into `N` little-endian register words.
#[inline]
pub fn split_words<const N: usize>(value: u64) -> [u16; N] {
    std::array::from_fn(|i| (value >> (16 * i)) as u16)
}

impl RegisterAccessor {
    /// Accessor over a shared transport.
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }

    fn read_span(&self, axis: u8, addr: u16, count: usize) -> Result<Vec<u16>, BusError> {
        let end = addr + (count as u16 - 1);
        let block =
            self.transport
                .borrow_mut()
                .read_registers(axis, RegionKind::Input, addr, end)?;
        if block.len() < count {
            return Err(BusError::ShortRead {
                address: addr,
                expected: count,
                got: block.len(),
            });
        }
        Ok(block.data)
    }

    /// Read one 16-bit register.
    pub fn read_u16(&self, axis: u8, addr: u16) -> Result<u16, BusError> {
        let words = self.read_span(axis, addr, 1)?;
        let value = words[0];
        trace!("axis {axis}: read u16 [{addr:#06x}] = {value:#06x}");
        Ok(value)
    }

    /// Read a 32-bit value spanning two registers.
    pub fn read_u32(&self, axis: u8, addr: u16) -> Result<u32, BusError> {
        let words = self.read_span(axis, addr, 2)?;
        let value = combine_words(&words) as u32;
        trace!("axis {axis}: read u32 [{addr:#06x}] = {value:#010x}");
        Ok(value)
    }

    /// Read a 64-bit value spanning four registers.
    pub fn read_u64(&self, axis: u8, addr: u16) -> Result<u64, BusError> {
        let words = self.read_span(axis, addr, 4)?;
        let value = combine_words(&words);
        trace!("axis {axis}: read u64 [{addr:#06x}] = {value:#018x}");
        Ok(value)
    }

    /// Read `count` consecutive registers.
    pub fn read_block(&self, axis: u8, addr: u16, count: usize) -> Result<Vec<u16>, BusError> {
        self.read_span(axis, addr, count)
    }

    fn write_span(&self, axis: u8, addr: u16, words: &[u16]) -> Result<(), BusError> {
        self.transport
            .borrow_mut()
            .write_registers(axis, RegionKind::Holding, addr, words)
    }

    /// Write one 16-bit register.
    pub fn write_u16(&self, axis: u8, addr: u16, value: u16) -> Result<(), BusError> {
        trace!("axis {axis}: write u16 [{addr:#06x}] = {value:#06x}");
        self.write_span(axis, addr, &[value])
    }

    /// Write a 32-bit value as two registers (low word first).
    pub fn write_u32(&self, axis: u8, addr: u16, value: u32) -> Result<(), BusError> {
        trace!("axis {axis}: write u32 [{addr:#06x}] = {value:#010x}");
        let words = split_words::<2>(u64::from(value));
        self.write_span(axis, addr, &words)
    }

    /// Write a 64-bit value as four registers (low word first).
    pub fn write_u64(&self, axis: u8, addr: u16, value: u64) -> Result<(), BusError> {
        trace!("axis {axis}: write u64 [{addr:#06x}] = {value:#018x}");
        let words = split_words::<4>(value);
        self.write_span(axis, addr, &words)
    }

    /// Write consecutive registers beginning at `addr`.
    pub fn write_block(&self, axis: u8, addr: u16, words: &[u16]) -> Result<(), BusError> {
        self.write_span(axis, addr, words)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{share, RegisterBlock, RegisterTransport};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    /// What the stub transport saw, shared with the test body.
    #[derive(Default)]
    struct TransportLog {
        writes: Vec<(u8, RegionKind, u16, Vec<u16>)>,
        reads: Vec<(u8, RegionKind, u16, u16)>,
    }

    /// Transport stub answering reads from canned register blocks and
    /// recording every call into a shared log.
    #[derive(Default)]
    struct StubTransport {
        canned: HashMap<u16, Vec<u16>>,
        log: Rc<RefCell<TransportLog>>,
        fail_io: bool,
    }

    impl RegisterTransport for StubTransport {
        fn open(&mut self, _identifier: &str) -> Result<(), BusError> {
            Ok(())
        }

        fn close(&mut self) {}

        fn is_open(&self) -> bool {
            true
        }

        fn read_registers(
            &mut self,
            axis: u8,
            region: RegionKind,
            start: u16,
            end: u16,
        ) -> Result<RegisterBlock, BusError> {
            self.log.borrow_mut().reads.push((axis, region, start, end));
            if self.fail_io {
                return Err(BusError::Io("stubbed failure".to_string()));
            }
            match self.canned.get(&start) {
                Some(words) => Ok(RegisterBlock::new(words.clone())),
                None => Err(BusError::Timeout),
            }
        }

        fn write_registers(
            &mut self,
            axis: u8,
            region: RegionKind,
            start: u16,
            values: &[u16],
        ) -> Result<(), BusError> {
            if self.fail_io {
                return Err(BusError::Io("stubbed failure".to_string()));
            }
            self.log
                .borrow_mut()
                .writes
                .push((axis, region, start, values.to_vec()));
            Ok(())
        }
    }

    fn stub_with(canned: &[(u16, Vec<u16>)]) -> (RegisterAccessor, Rc<RefCell<TransportLog>>) {
        let mut stub = StubTransport::default();
        for (addr, words) in canned {
            stub.canned.insert(*addr, words.clone());
        }
        let log = stub.log.clone();
        (RegisterAccessor::new(share(stub)), log)
    }

    #[test]
    fn write_u32_splits_low_word_first() {
        let (accessor, log) = stub_with(&[]);
        accessor.write_u32(1, 0x0202, 0xDEAD_BEEF).unwrap();
        let log = log.borrow();
        assert_eq!(log.writes.len(), 1);
        let (axis, region, addr, words) = &log.writes[0];
        assert_eq!(*axis, 1);
        assert_eq!(*region, RegionKind::Holding);
        assert_eq!(*addr, 0x0202);
        assert_eq!(words, &vec![0xBEEF, 0xDEAD]);
    }

    #[test]
    fn write_u64_splits_into_four_words() {
        let (accessor, log) = stub_with(&[]);
        accessor.write_u64(1, 0x0202, 0x1111_2222_3333_4444).unwrap();
        let log = log.borrow();
        assert_eq!(
            log.writes[0].3,
            vec![0x4444, 0x3333, 0x2222, 0x1111]
        );
    }

    #[test]
    fn read_u64_recombines_four_words() {
        let (accessor, _log) = stub_with(&[(0x1018, vec![0x4444, 0x3333, 0x2222, 0x1111])]);
        let value = accessor.read_u64(2, 0x1018).unwrap();
        assert_eq!(value, 0x1111_2222_3333_4444);
    }

    #[test]
    fn read_u32_recombines_two_words() {
        let (accessor, _log) = stub_with(&[(0x0010, vec![0xBEEF, 0xDEAD])]);
        assert_eq!(accessor.read_u32(1, 0x0010).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn reads_use_input_region() {
        let (accessor, log) = stub_with(&[(0x0015, vec![100])]);
        accessor.read_u16(1, 0x0015).unwrap();
        let log = log.borrow();
        assert_eq!(log.reads[0].1, RegionKind::Input);
        assert_eq!(log.reads[0].3, 0x0015); // single register: end == start
    }

    #[test]
    fn short_read_is_an_error() {
        let (accessor, _log) = stub_with(&[(0x1018, vec![0x0001, 0x0002])]);
        let result = accessor.read_u64(1, 0x1018);
        assert!(matches!(
            result,
            Err(BusError::ShortRead {
                expected: 4,
                got: 2,
                ..
            })
        ));
    }

    #[test]
    fn transport_failure_propagates_without_retry() {
        let mut stub = StubTransport::default();
        stub.fail_io = true;
        let log = stub.log.clone();
        let accessor = RegisterAccessor::new(share(stub));
        assert!(matches!(accessor.read_u16(1, 0x0001), Err(BusError::Io(_))));
        // Exactly one transport call: the accessor does not retry.
        assert_eq!(log.borrow().reads.len(), 1);
    }

    #[test]
    fn split_combine_round_trip() {
        for value in [0u64, 1, 0xFFFF, 0x1_0000, u64::MAX, 0x0123_4567_89AB_CDEF] {
            let words = split_words::<4>(value);
            assert_eq!(combine_words(&words), value);
        }
    }
}
