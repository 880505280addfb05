//! Platform abstraction layer for kernel memory access.
//!
//! This module provides an abstraction over the memory operations the
//! monitor needs (address translation, word reads, the current frame
//! pointer) to allow testing in user space.

/// Kernel memory operations.
///
/// Abstracts over kernel-specific operations to enable mock testing.
pub trait KernelMemory {
    /// Translate a physical address to its kernel virtual alias.
    fn phys_to_virt(&self, paddr: usize) -> usize;

    /// Translate a kernel virtual address back to its physical address.
    fn virt_to_phys(&self, vaddr: usize) -> usize;

    /// Read one machine word at a kernel virtual address.
    ///
    /// # Safety
    /// The address is operator or stack supplied. A read of unmapped memory
    /// faults, and recovering from that is up to the host kernel.
    unsafe fn read_word(&self, vaddr: usize) -> usize;

    /// Frame pointer of the current call chain.
    ///
    /// Called through `&dyn KernelMemory`, so a register read lands in this
    /// method's own frame; its return address lies in the caller.
    fn frame_pointer(&self) -> usize;
}

// =============================================================================
// Real Implementation (kernel environment with axhal)
// =============================================================================

/// Real platform operations using axhal.
#[cfg(all(not(test), feature = "axhal"))]
pub struct RealPlatform;

#[cfg(all(not(test), feature = "axhal"))]
impl KernelMemory for RealPlatform {
    fn phys_to_virt(&self, paddr: usize) -> usize {
        axhal::mem::phys_to_virt(paddr.into()).as_usize()
    }

    fn virt_to_phys(&self, vaddr: usize) -> usize {
        axhal::mem::virt_to_phys(vaddr.into()).as_usize()
    }

    unsafe fn read_word(&self, vaddr: usize) -> usize {
        // SAFETY: forwarded to the caller.
        unsafe { core::ptr::read_volatile(vaddr as *const usize) }
    }

    fn frame_pointer(&self) -> usize {
        read_frame_pointer()
    }
}

/// Read the frame pointer register.
#[cfg(all(not(test), feature = "axhal", target_arch = "x86_64"))]
#[inline(always)]
fn read_frame_pointer() -> usize {
    let fp: usize;
    unsafe {
        core::arch::asm!("mov {}, rbp", out(reg) fp, options(nomem, nostack, preserves_flags));
    }
    fp
}

/// Read the frame pointer register.
#[cfg(all(not(test), feature = "axhal", target_arch = "aarch64"))]
#[inline(always)]
fn read_frame_pointer() -> usize {
    let fp: usize;
    unsafe {
        core::arch::asm!("mov {}, x29", out(reg) fp, options(nomem, nostack, preserves_flags));
    }
    fp
}

#[cfg(all(
    not(test),
    feature = "axhal",
    not(any(target_arch = "x86_64", target_arch = "aarch64"))
))]
fn read_frame_pointer() -> usize {
    log::warn!("read_frame_pointer: not implemented for this architecture");
    0
}

// =============================================================================
// Mock Implementation (test environment or no axhal)
// =============================================================================

#[cfg(any(test, feature = "test-utils", not(feature = "axhal")))]
pub use mock::{MOCK_PHYS_OFFSET, MockPlatform};

#[cfg(any(test, feature = "test-utils", not(feature = "axhal")))]
mod mock {
    use alloc::collections::BTreeMap;
    use alloc::vec::Vec;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use spin::Mutex;

    use super::KernelMemory;

    /// Offset of the mock linear mapping: `virt = phys + MOCK_PHYS_OFFSET`.
    pub const MOCK_PHYS_OFFSET: usize = 0xf000_0000;

    /// Mock platform operations for testing.
    ///
    /// Memory is a sparse word store; unwritten words read as zero. Every
    /// read is logged so tests can check which addresses were touched.
    pub struct MockPlatform {
        words: Mutex<BTreeMap<usize, usize>>,
        reads: Mutex<Vec<usize>>,
        frame_pointer: AtomicUsize,
    }

    impl MockPlatform {
        pub const fn new() -> Self {
            Self {
                words: Mutex::new(BTreeMap::new()),
                reads: Mutex::new(Vec::new()),
                frame_pointer: AtomicUsize::new(0),
            }
        }

        /// Store a word at a virtual address.
        pub fn write_word(&self, vaddr: usize, value: usize) {
            self.words.lock().insert(vaddr, value);
        }

        /// Store consecutive words starting at a virtual address.
        pub fn write_words(&self, vaddr: usize, values: &[usize]) {
            let mut words = self.words.lock();
            for (i, value) in values.iter().enumerate() {
                words.insert(vaddr + i * core::mem::size_of::<usize>(), *value);
            }
        }

        /// Set the frame pointer returned by [`KernelMemory::frame_pointer`].
        pub fn set_frame_pointer(&self, fp: usize) {
            self.frame_pointer.store(fp, Ordering::Relaxed);
        }

        /// Addresses read so far, in order.
        pub fn read_log(&self) -> Vec<usize> {
            self.reads.lock().clone()
        }
    }

    impl Default for MockPlatform {
        fn default() -> Self {
            Self::new()
        }
    }

    impl KernelMemory for MockPlatform {
        fn phys_to_virt(&self, paddr: usize) -> usize {
            paddr.wrapping_add(MOCK_PHYS_OFFSET)
        }

        fn virt_to_phys(&self, vaddr: usize) -> usize {
            vaddr.wrapping_sub(MOCK_PHYS_OFFSET)
        }

        unsafe fn read_word(&self, vaddr: usize) -> usize {
            self.reads.lock().push(vaddr);
            self.words.lock().get(&vaddr).copied().unwrap_or(0)
        }

        fn frame_pointer(&self) -> usize {
            self.frame_pointer.load(Ordering::Relaxed)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_translation_round_trip() {
        let platform = MockPlatform::new();
        let vaddr = platform.phys_to_virt(0x1000);
        assert_eq!(vaddr, 0x1000 + MOCK_PHYS_OFFSET);
        assert_eq!(platform.virt_to_phys(vaddr), 0x1000);
    }

    #[test]
    fn test_mock_read_logs_addresses() {
        let platform = MockPlatform::new();
        platform.write_words(0x2000, &[7, 8]);

        let word = core::mem::size_of::<usize>();
        let values = unsafe { [platform.read_word(0x2000), platform.read_word(0x2000 + word)] };
        assert_eq!(values, [7, 8]);
        assert_eq!(platform.read_log(), [0x2000, 0x2000 + word]);
    }

    #[test]
    fn test_mock_frame_pointer() {
        let platform = MockPlatform::new();
        platform.set_frame_pointer(0x8000);
        assert_eq!(platform.frame_pointer(), 0x8000);
    }
}
