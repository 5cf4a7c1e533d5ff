//! Cross-process tests
//!
//! Workers are real processes created with fork(). Only the descriptor travels
//! to them, through a pipe, and they attach to the region by its identity.

#[cfg(unix)]
mod integration {
    use nix::sys::wait::{waitpid, WaitStatus};
    use nix::unistd::{fork, pipe, ForkResult, Pid};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::fs::File;
    use std::io::{Read, Write};
    use std::panic::{self, AssertUnwindSafe};

    use shmarray::{ArrayDescriptor, Backend, DType, Error, SharedArray, ShmConfig};

    /// One-way pipe as (reader, writer)
    fn channel() -> (File, File) {
        let (r, w) = pipe().unwrap();
        (File::from(r), File::from(w))
    }

    /// Fork a worker running `work`; its return value becomes the exit code
    fn spawn_worker(work: impl FnOnce() -> i32) -> Pid {
        match unsafe { fork() }.unwrap() {
            ForkResult::Child => {
                // A panic must not unwind back into the test harness.
                let code = panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or(101);
                // Skip atexit handlers inherited from the test harness.
                unsafe { nix::libc::_exit(code) }
            }
            ForkResult::Parent { child } => child,
        }
    }

    fn join(worker: Pid) -> i32 {
        match waitpid(worker, None).unwrap() {
            WaitStatus::Exited(_, code) => code,
            other => panic!("worker ended abnormally: {:?}", other),
        }
    }

    fn run_worker(work: impl FnOnce() -> i32) -> i32 {
        join(spawn_worker(work))
    }

    fn configs(dir: &tempfile::TempDir) -> Vec<ShmConfig> {
        vec![
            ShmConfig::new(Backend::Native),
            ShmConfig::new(Backend::TmpFile).with_dir(dir.path()),
        ]
    }

    /// Worker writes 89 at (40, 50) of a zeroed 100x100 u16 array
    #[test]
    fn test_subprocess_write() {
        let dir = tempfile::tempdir().unwrap();
        for config in configs(&dir) {
            let mut shm = SharedArray::allocate_with(&config, &[100, 100], DType::UInt16).unwrap();
            shm.with_view::<u16, _>(|m| m.fill(0)).unwrap().unwrap();

            let (desc_rx, mut desc_tx) = channel();
            shm.descriptor().encode_into(&mut desc_tx).unwrap();

            let code = run_worker(move || {
                let descriptor = ArrayDescriptor::decode_from(desc_rx).unwrap();
                let mut clone = SharedArray::attach(&descriptor).unwrap();
                assert!(!clone.is_owner());
                clone
                    .with_view::<u16, _>(|m| m.set(&[40, 50], 89))
                    .unwrap()
                    .unwrap();
                0
            });
            assert_eq!(code, 0);

            let view = shm.view::<u16>().unwrap();
            assert_eq!(view.get(&[40, 50]), Some(89));
            assert_eq!(view.as_slice().iter().map(|&v| v as u64).sum::<u64>(), 89);
        }
    }

    /// Worker reads back (55, 33) of a pseudo-random array filled by the parent
    #[test]
    fn test_subprocess_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(1234);
        let pattern: Vec<u16> = (0..100 * 100).map(|_| rng.random_range(0..65535)).collect();

        for config in configs(&dir) {
            let mut shm = SharedArray::allocate_with(&config, &[100, 100], DType::UInt16).unwrap();
            shm.with_view::<u16, _>(|m| m.copy_from_slice(&pattern))
                .unwrap()
                .unwrap();

            let (desc_rx, mut desc_tx) = channel();
            let (mut result_rx, mut result_tx) = channel();
            shm.descriptor().encode_into(&mut desc_tx).unwrap();

            let code = run_worker(move || {
                let descriptor = ArrayDescriptor::decode_from(desc_rx).unwrap();
                let clone = SharedArray::attach(&descriptor).unwrap();
                let value = clone.view::<u16>().unwrap().get(&[55, 33]).unwrap();
                result_tx.write_all(&value.to_le_bytes()).unwrap();
                0
            });
            assert_eq!(code, 0);

            let mut buf = [0u8; 2];
            result_rx.read_exact(&mut buf).unwrap();
            assert_eq!(u16::from_le_bytes(buf), pattern[55 * 100 + 33]);
        }
    }

    /// A worker's handle going away leaves the region alone
    #[test]
    fn test_worker_teardown_keeps_region() {
        let dir = tempfile::tempdir().unwrap();
        for config in configs(&dir) {
            let shm = SharedArray::allocate_with(&config, &[64], DType::Float64).unwrap();

            let (rx, mut tx) = channel();
            bincode::serialize_into(&mut tx, &shm).unwrap();

            let code = run_worker(move || {
                let mut clone: SharedArray = bincode::deserialize_from(rx).unwrap();
                clone.with_view::<f64, _>(|m| m.fill(2.5)).unwrap().unwrap();
                clone.close().unwrap();
                0
            });
            assert_eq!(code, 0);

            assert!(shm.view::<f64>().unwrap().as_slice().iter().all(|&v| v == 2.5));
            let again = SharedArray::attach(&shm.descriptor()).unwrap();
            assert_eq!(again.view::<f64>().unwrap().get(&[63]), Some(2.5));
        }
    }

    /// Once the owner closes, a worker still holding a handle cannot view
    #[test]
    fn test_owner_close_seen_by_worker() {
        let dir = tempfile::tempdir().unwrap();
        for config in configs(&dir) {
            let shm = SharedArray::allocate_with(&config, &[10, 10], DType::Int32).unwrap();
            let descriptor = shm.descriptor();

            let (desc_rx, mut desc_tx) = channel();
            let (mut ready_rx, mut ready_tx) = channel();
            let (mut closed_rx, mut closed_tx) = channel();
            descriptor.encode_into(&mut desc_tx).unwrap();

            let worker = spawn_worker(move || {
                let descriptor = ArrayDescriptor::decode_from(desc_rx).unwrap();
                let clone = SharedArray::attach(&descriptor).unwrap();
                assert!(clone.view::<i32>().is_ok());
                ready_tx.write_all(&[1]).unwrap();

                let mut buf = [0u8; 1];
                closed_rx.read_exact(&mut buf).unwrap();
                let code = match clone.view::<i32>() {
                    Err(Error::RegionUnavailable(_)) => 0,
                    _ => 1,
                };
                code
            });

            let mut buf = [0u8; 1];
            ready_rx.read_exact(&mut buf).unwrap();
            shm.close().unwrap();
            closed_tx.write_all(&[1]).unwrap();

            assert_eq!(join(worker), 0);
            assert!(matches!(
                SharedArray::attach(&descriptor),
                Err(Error::RegionUnavailable(_))
            ));
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    /// Disjoint rows written by several workers all land in the parent's view
    #[test]
    fn test_workers_write_disjoint_rows() {
        let dir = tempfile::tempdir().unwrap();
        for config in configs(&dir) {
            let shm = SharedArray::allocate_with(&config, &[4, 256], DType::UInt8).unwrap();

            let workers: Vec<Pid> = (0..4u8)
                .map(|row| {
                    let (rx, mut tx) = channel();
                    shm.descriptor().encode_into(&mut tx).unwrap();
                    spawn_worker(move || {
                        let descriptor = ArrayDescriptor::decode_from(rx).unwrap();
                        let mut clone = SharedArray::attach(&descriptor).unwrap();
                        let mut view = clone.view_mut::<u8>().unwrap();
                        for col in 0..256 {
                            view.set(&[row as usize, col], row + 1).unwrap();
                        }
                        0
                    })
                })
                .collect();

            for worker in workers {
                assert_eq!(join(worker), 0);
            }

            let view = shm.view::<u8>().unwrap();
            for row in 0..4 {
                assert!((0..256).all(|col| view.get(&[row, col]) == Some(row as u8 + 1)));
            }
        }
    }
}
