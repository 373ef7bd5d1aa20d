use log::{debug, error, info, trace};
use std::io;

pub trait ProcessMemoryReader {
    fn attach(&mut self, pid: u32) -> io::Result<()>;
    fn read_memory(&self, address: usize, size: usize) -> io::Result<Vec<u8>>;
    fn detach(&mut self) -> io::Result<()>;
    fn is_attached(&self) -> bool;
}

// ─── Typed reads ────────────────────────────────────────────────────

fn read_exact<const N: usize>(
    reader: &dyn ProcessMemoryReader,
    address: usize,
) -> io::Result<[u8; N]> {
    let data = reader.read_memory(address, N)?;
    data.get(..N)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short read at 0x{:X}: {} of {} bytes", address, data.len(), N),
            )
        })
}

pub fn read_u16(reader: &dyn ProcessMemoryReader, address: usize) -> io::Result<u16> {
    read_exact::<2>(reader, address).map(u16::from_le_bytes)
}

pub fn read_u32(reader: &dyn ProcessMemoryReader, address: usize) -> io::Result<u32> {
    read_exact::<4>(reader, address).map(u32::from_le_bytes)
}

pub fn read_i32(reader: &dyn ProcessMemoryReader, address: usize) -> io::Result<i32> {
    read_exact::<4>(reader, address).map(i32::from_le_bytes)
}

pub fn read_f32(reader: &dyn ProcessMemoryReader, address: usize) -> io::Result<f32> {
    read_exact::<4>(reader, address).map(f32::from_le_bytes)
}

// ─── Platform readers ───────────────────────────────────────────────

#[cfg(windows)]
mod windows_impl {
    use super::*;
    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
    use windows::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ};

    pub struct WindowsMemoryReader {
        handle: Option<HANDLE>,
    }

    impl WindowsMemoryReader {
        pub fn new() -> Self {
            Self { handle: None }
        }
    }

    impl ProcessMemoryReader for WindowsMemoryReader {
        fn attach(&mut self, pid: u32) -> io::Result<()> {
            self.detach()?;
            info!("Opening game process PID={} for reading", pid);
            let handle = unsafe { OpenProcess(PROCESS_VM_READ | PROCESS_QUERY_INFORMATION, false, pid) }
                .map_err(|e| {
                    error!("OpenProcess failed for PID={}: {}", pid, e);
                    io::Error::new(io::ErrorKind::PermissionDenied, e.to_string())
                })?;
            self.handle = Some(handle);
            Ok(())
        }

        fn read_memory(&self, address: usize, size: usize) -> io::Result<Vec<u8>> {
            let handle = self
                .handle
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "Not attached"))?;
            let mut buffer = vec![0u8; size];
            let mut bytes_read = 0usize;
            trace!("ReadProcessMemory addr=0x{:X} size={}", address, size);
            unsafe {
                ReadProcessMemory(
                    handle,
                    address as *const _,
                    buffer.as_mut_ptr() as *mut _,
                    size,
                    Some(&mut bytes_read),
                )
            }
            .map_err(|e| {
                debug!("ReadProcessMemory failed at 0x{:X} (size={}): {}", address, size, e);
                io::Error::new(io::ErrorKind::Other, e.to_string())
            })?;
            buffer.truncate(bytes_read);
            Ok(buffer)
        }

        fn detach(&mut self) -> io::Result<()> {
            if let Some(handle) = self.handle.take() {
                info!("Closing process handle {:?}", handle);
                unsafe { CloseHandle(handle) }
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            }
            Ok(())
        }

        fn is_attached(&self) -> bool {
            self.handle.is_some()
        }
    }

    impl Drop for WindowsMemoryReader {
        fn drop(&mut self) {
            let _ = self.detach();
        }
    }
}

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use std::fs::File;
    use std::os::unix::fs::FileExt;

    /// Reads through `/proc/<pid>/mem`, e.g. for a game running under Wine.
    pub struct LinuxMemoryReader {
        mem_file: Option<File>,
    }

    impl LinuxMemoryReader {
        pub fn new() -> Self {
            Self { mem_file: None }
        }
    }

    impl ProcessMemoryReader for LinuxMemoryReader {
        fn attach(&mut self, pid: u32) -> io::Result<()> {
            self.detach()?;
            let path = format!("/proc/{}/mem", pid);
            info!("Opening {} for memory reading", path);
            let file = File::open(&path).map_err(|e| {
                error!("Failed to open {}: {}", path, e);
                e
            })?;
            self.mem_file = Some(file);
            Ok(())
        }

        fn read_memory(&self, address: usize, size: usize) -> io::Result<Vec<u8>> {
            let file = self
                .mem_file
                .as_ref()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "Not attached"))?;
            trace!("Reading /proc mem at 0x{:X} size={}", address, size);
            let mut buffer = vec![0u8; size];
            let bytes_read = file.read_at(&mut buffer, address as u64).map_err(|e| {
                debug!("read_at failed at 0x{:X} (size={}): {}", address, size, e);
                e
            })?;
            buffer.truncate(bytes_read);
            Ok(buffer)
        }

        fn detach(&mut self) -> io::Result<()> {
            if self.mem_file.take().is_some() {
                info!("Closed /proc/mem file");
            }
            Ok(())
        }

        fn is_attached(&self) -> bool {
            self.mem_file.is_some()
        }
    }
}

#[cfg(not(any(windows, target_os = "linux")))]
mod unsupported_impl {
    use super::*;

    pub struct UnsupportedReader;

    impl ProcessMemoryReader for UnsupportedReader {
        fn attach(&mut self, pid: u32) -> io::Result<()> {
            error!("Cannot attach to PID={}: memory reading unsupported on this platform", pid);
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "memory reading not supported on this platform",
            ))
        }

        fn read_memory(&self, _address: usize, _size: usize) -> io::Result<Vec<u8>> {
            Err(io::Error::new(io::ErrorKind::NotConnected, "Not attached"))
        }

        fn detach(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn is_attached(&self) -> bool {
            false
        }
    }
}

pub fn create_reader() -> Box<dyn ProcessMemoryReader> {
    #[cfg(windows)]
    {
        Box::new(windows_impl::WindowsMemoryReader::new())
    }
    #[cfg(target_os = "linux")]
    {
        Box::new(linux_impl::LinuxMemoryReader::new())
    }
    #[cfg(not(any(windows, target_os = "linux")))]
    {
        Box::new(unsupported_impl::UnsupportedReader)
    }
}
