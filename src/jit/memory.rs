//! Executable memory management using mmap.
//!
//! This module provides a safe abstraction over OS-level memory mapping
//! for allocating memory that can be written to and then executed. It is
//! the one unsafe boundary of the crate: the region is owned end-to-end
//! and unmapped on every exit path via Drop.

use std::ptr::NonNull;

/// Error type for memory operations.
#[derive(Debug, PartialEq, Eq)]
pub enum MemoryError {
    AllocationFailed,
    ProtectionFailed,
    InvalidSize,
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryError::AllocationFailed => write!(f, "memory allocation failed"),
            MemoryError::ProtectionFailed => write!(f, "memory protection change failed"),
            MemoryError::InvalidSize => write!(f, "invalid memory size"),
        }
    }
}

impl std::error::Error for MemoryError {}

/// A block of executable memory allocated via mmap.
///
/// The memory is initially writable. Call `make_executable()` to make it
/// executable (and read-only) before calling the generated code.
#[derive(Debug)]
pub struct ExecutableMemory {
    ptr: NonNull<u8>,
    size: usize,
    executable: bool,
}

impl ExecutableMemory {
    /// Allocate a new block of memory with the given size, rounded up to
    /// the page size. The memory is initially writable but not executable.
    pub fn new(size: usize) -> Result<Self, MemoryError> {
        if size == 0 {
            return Err(MemoryError::InvalidSize);
        }

        let page_size = Self::page_size();
        let aligned_size = (size + page_size - 1) & !(page_size - 1);

        let ptr = Self::mmap_alloc(aligned_size)?;

        Ok(Self {
            ptr,
            size: aligned_size,
            executable: false,
        })
    }

    fn page_size() -> usize {
        unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
    }

    fn mmap_alloc(size: usize) -> Result<NonNull<u8>, MemoryError> {
        use std::ptr;

        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(MemoryError::AllocationFailed);
        }

        NonNull::new(ptr as *mut u8).ok_or(MemoryError::AllocationFailed)
    }

    /// Get a pointer to the memory.
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Get the size of the allocated memory.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Write bytes to the memory at the given offset.
    /// Returns an error if the memory is executable or the write would
    /// overflow.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), MemoryError> {
        if self.executable {
            return Err(MemoryError::ProtectionFailed);
        }

        if offset + data.len() > self.size {
            return Err(MemoryError::InvalidSize);
        }

        unsafe {
            let dest = self.ptr.as_ptr().add(offset);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dest, data.len());
        }

        Ok(())
    }

    /// Make the memory executable (and read-only).
    /// After this call, the memory can no longer be written to.
    pub fn make_executable(&mut self) -> Result<(), MemoryError> {
        if self.executable {
            return Ok(());
        }

        let result = unsafe {
            libc::mprotect(
                self.ptr.as_ptr() as *mut libc::c_void,
                self.size,
                libc::PROT_READ | libc::PROT_EXEC,
            )
        };

        if result != 0 {
            return Err(MemoryError::ProtectionFailed);
        }

        self.executable = true;
        Ok(())
    }

    /// Check if the memory is executable.
    pub fn is_executable(&self) -> bool {
        self.executable
    }

    /// Get a function pointer to the start of the memory.
    /// The memory must be executable.
    ///
    /// # Safety
    /// The caller must ensure that the memory contains valid machine code
    /// for the target architecture and that `F` is a function pointer type
    /// with the code's actual ABI.
    pub unsafe fn as_fn<F>(&self) -> Option<F>
    where
        F: Copy,
    {
        if !self.executable {
            return None;
        }

        if std::mem::size_of::<F>() != std::mem::size_of::<fn()>() {
            return None;
        }

        // SAFETY: Caller guarantees the memory contains valid code
        Some(unsafe { std::mem::transmute_copy(&self.ptr.as_ptr()) })
    }
}

impl Drop for ExecutableMemory {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.size);
        }
    }
}
