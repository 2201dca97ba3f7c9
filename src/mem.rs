use crate::error::{Fault, MemError};

/// Machine word size in bytes
pub const WORD_SIZE: u32 = 4;

/// Byte order of every word held in an address space
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

impl ByteOrder {
    pub fn decode(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Big => u32::from_be_bytes(bytes),
            ByteOrder::Little => u32::from_le_bytes(bytes),
        }
    }

    pub fn encode(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
        }
    }
}

/// How a global address is mapped onto region storage
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Translation {
    /// Linear scan for the region owning the address
    #[default]
    Regions,

    /// Index the first region's storage with the raw address, ignoring its base. Cheaper, but only
    /// meaningful for a single region based at 0
    Flat,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MemConfig {
    pub byte_order: ByteOrder,
    pub translation: Translation,
}

/// A contiguous block of memory mapped at `base`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    base: u32,
    mem: Box<[u8]>,
}

impl Region {
    /// Construct a zero-filled region
    pub fn new(base: u32, size: u32) -> Region {
        Region {
            base,
            mem: vec![0; size as usize].into_boxed_slice(),
        }
    }

    /// Construct a region with `image` copied verbatim to its start. The rest is zero-filled
    pub fn with_image(base: u32, size: u32, image: &[u8]) -> Result<Region, MemError> {
        if image.len() > size as usize {
            return Err(MemError::ImageTooLarge {
                len: image.len(),
                size,
            });
        }
        let mut region = Region::new(base, size);
        region.mem[..image.len()].copy_from_slice(image);
        Ok(region)
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn size(&self) -> u32 {
        self.mem.len() as u32
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mem
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.mem
    }

    fn contains(&self, addr: u32) -> bool {
        addr >= self.base && addr - self.base < self.size()
    }
}

/// A sparse 32-bit address space made of non-overlapping regions. Overlap is not checked; the
/// first matching region wins.
#[derive(Clone, Debug)]
pub struct AddressSpace {
    regions: Vec<Region>,
    config: MemConfig,
}

impl AddressSpace {
    pub fn new(regions: Vec<Region>) -> Result<AddressSpace, MemError> {
        AddressSpace::with_config(regions, MemConfig::default())
    }

    pub fn with_config(regions: Vec<Region>, config: MemConfig) -> Result<AddressSpace, MemError> {
        if regions.is_empty() {
            return Err(MemError::EmptyAddressSpace);
        }
        Ok(AddressSpace { regions, config })
    }

    pub fn config(&self) -> MemConfig {
        self.config
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, index: usize) -> Option<&Region> {
        self.regions.get(index)
    }

    pub fn region_mut(&mut self, index: usize) -> Option<&mut Region> {
        self.regions.get_mut(index)
    }

    /// Find the region index and offset into its storage for an address
    fn locate(&self, addr: u32) -> Option<(usize, usize)> {
        match self.config.translation {
            Translation::Regions => self
                .regions
                .iter()
                .position(|r| r.contains(addr))
                .map(|i| (i, (addr - self.regions[i].base) as usize)),
            Translation::Flat => {
                let offset = addr as usize;
                (offset < self.regions[0].mem.len()).then_some((0, offset))
            }
        }
    }

    /// Read a word, yielding 0 for unmapped addresses. Bytes past the end of the owning region
    /// read as 0
    pub fn read_word(&self, addr: u32) -> u32 {
        let mut bytes = [0u8; 4];
        match self.locate(addr) {
            Some((i, offset)) => {
                let avail = &self.regions[i].mem[offset..];
                let n = avail.len().min(bytes.len());
                bytes[..n].copy_from_slice(&avail[..n]);
            }
            None => tracing::debug!("unmapped read at 0x{:08x}", addr),
        }
        self.config.byte_order.decode(bytes)
    }

    /// Read a single opcode byte, yielding 0 for unmapped addresses
    pub fn read_opcode_byte(&self, addr: u32) -> u8 {
        self.locate(addr)
            .map(|(i, offset)| self.regions[i].mem[offset])
            .unwrap_or(0)
    }

    /// Write a word, silently discarding writes to unmapped addresses. Only the bytes that land
    /// inside the owning region are stored
    pub fn write_word(&mut self, addr: u32, value: u32) {
        match self.locate(addr) {
            Some((i, offset)) => {
                let bytes = self.config.byte_order.encode(value);
                let avail = &mut self.regions[i].mem[offset..];
                let n = avail.len().min(bytes.len());
                avail[..n].copy_from_slice(&bytes[..n]);
            }
            None => tracing::debug!("unmapped write at 0x{:08x}", addr),
        }
    }

    /// Word slice for an access that must lie entirely inside one region
    fn span(&self, addr: u32) -> Result<(usize, usize), Fault> {
        match self.locate(addr) {
            Some((i, offset)) if self.regions[i].mem.len() - offset >= WORD_SIZE as usize => {
                Ok((i, offset))
            }
            _ => Err(Fault::UnmappedAddress { addr }),
        }
    }

    pub fn try_read_word(&self, addr: u32) -> Result<u32, Fault> {
        let (i, offset) = self.span(addr)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.regions[i].mem[offset..offset + 4]);
        Ok(self.config.byte_order.decode(bytes))
    }

    pub fn try_read_opcode_byte(&self, addr: u32) -> Result<u8, Fault> {
        self.locate(addr)
            .map(|(i, offset)| self.regions[i].mem[offset])
            .ok_or(Fault::UnmappedAddress { addr })
    }

    pub fn try_write_word(&mut self, addr: u32, value: u32) -> Result<(), Fault> {
        let (i, offset) = self.span(addr)?;
        let bytes = self.config.byte_order.encode(value);
        self.regions[i].mem[offset..offset + 4].copy_from_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use rstest::rstest;

    fn space(order: ByteOrder) -> AddressSpace {
        let config = MemConfig {
            byte_order: order,
            ..Default::default()
        };
        AddressSpace::with_config(vec![Region::new(0, 0x1000)], config).unwrap()
    }

    #[test]
    fn test_empty_space_rejected() {
        assert_eq!(
            AddressSpace::new(vec![]).unwrap_err(),
            MemError::EmptyAddressSpace
        );
    }

    #[test]
    fn test_image_too_large() {
        assert_eq!(
            Region::with_image(0, 2, &[1, 2, 3]).unwrap_err(),
            MemError::ImageTooLarge { len: 3, size: 2 }
        );
        let region = Region::with_image(0, 4, &[1, 2]).unwrap();
        assert_eq!(region.bytes(), &[1, 2, 0, 0]);
    }

    #[test]
    fn test_unmapped_read_is_zero() {
        let mem = space(ByteOrder::Big);
        assert_eq!(mem.read_word(0x2000), 0);
        assert_eq!(mem.read_opcode_byte(0x2000), 0);
        assert_eq!(
            mem.try_read_word(0x2000),
            Err(Fault::UnmappedAddress { addr: 0x2000 })
        );
    }

    #[test]
    fn test_unmapped_write_is_discarded() {
        let mut mem = space(ByteOrder::Big);
        mem.write_word(0x2000, 0xdeadbeef);
        assert!(mem.region(0).unwrap().bytes().iter().all(|&b| b == 0));
        assert_eq!(mem.read_word(0x2000), 0);
        assert_eq!(
            mem.try_write_word(0x2000, 1),
            Err(Fault::UnmappedAddress { addr: 0x2000 })
        );
    }

    #[rstest]
    #[case(ByteOrder::Big, [0x12, 0x34, 0x56, 0x78])]
    #[case(ByteOrder::Little, [0x78, 0x56, 0x34, 0x12])]
    fn test_wire_byte_order(#[case] order: ByteOrder, #[case] expected: [u8; 4]) {
        let mut mem = space(order);
        mem.write_word(0x10, 0x12345678);
        assert_eq!(&mem.region(0).unwrap().bytes()[0x10..0x14], &expected);
        assert_eq!(mem.read_opcode_byte(0x10), expected[0]);
    }

    #[rstest]
    #[case(ByteOrder::Big)]
    #[case(ByteOrder::Little)]
    fn test_write_read_word(#[case] order: ByteOrder) {
        let mut mem = space(order);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2000 {
            let addr = rng.gen_range(0..=0x1000 - WORD_SIZE);
            let value: u32 = rng.gen();
            mem.write_word(addr, value);
            assert_eq!(mem.read_word(addr), value);
            assert_eq!(mem.try_read_word(addr), Ok(value));
        }
    }

    #[test]
    fn test_multiple_regions() {
        let mut mem =
            AddressSpace::new(vec![Region::new(0, 0x100), Region::new(0x8000_0000, 0x100)])
                .unwrap();
        mem.write_word(0x8000_0010, 0xcafef00d);
        mem.write_word(0x10, 0x11223344);
        assert_eq!(mem.read_word(0x8000_0010), 0xcafef00d);
        assert_eq!(mem.read_word(0x10), 0x11223344);
        assert_eq!(mem.region(1).unwrap().bytes()[0x10], 0xca);
        assert_eq!(mem.read_word(0x100), 0);
        assert_eq!(mem.read_word(0x7fff_fffc), 0);
    }

    #[test]
    fn test_word_straddling_region_end() {
        let mut mem = AddressSpace::new(vec![Region::new(0, 0x10)]).unwrap();
        mem.write_word(0x0e, 0xaabbccdd);
        assert_eq!(&mem.region(0).unwrap().bytes()[0x0e..], &[0xaa, 0xbb]);
        assert_eq!(mem.read_word(0x0e), 0xaabb0000);
        assert_eq!(
            mem.try_read_word(0x0e),
            Err(Fault::UnmappedAddress { addr: 0x0e })
        );
        assert_eq!(
            mem.try_write_word(0x0e, 0),
            Err(Fault::UnmappedAddress { addr: 0x0e })
        );
        assert_eq!(mem.read_word(0x0e), 0xaabb0000);
    }

    #[test]
    fn test_flat_translation_ignores_base() {
        let config = MemConfig {
            translation: Translation::Flat,
            ..Default::default()
        };
        let mut mem = AddressSpace::with_config(vec![Region::new(0x100, 0x20)], config).unwrap();
        mem.write_word(0x04, 0x01020304);
        assert_eq!(&mem.region(0).unwrap().bytes()[4..8], &[1, 2, 3, 4]);
        assert_eq!(mem.read_word(0x104), 0);
        assert_eq!(mem.read_opcode_byte(0x07), 4);
    }
}
