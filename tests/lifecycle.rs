//! The full startup / shutdown cycle needs the whole process to itself, so
//! it lives in its own integration binary and in a single test.

use pagepool::{get_allocator, shutdown, startup, MemError};

#[test]
fn startup_allocate_shutdown_and_restart() {
    assert_eq!(pagepool::stats::reserved_bytes(), 0);
    startup(2).expect("first startup");
    assert!(pagepool::stats::reserved_bytes() > 0);

    // A second startup while the first is live must be refused.
    assert_eq!(startup(1).unwrap_err(), MemError::AlreadyInitialized);

    let a = get_allocator(0);
    let b = get_allocator(1);

    unsafe {
        let s_a = a.alloc::<u8>(54).unwrap();
        let s_b = b.alloc::<u8>(54).unwrap();
        assert_ne!(s_a.as_ptr(), s_b.as_ptr());

        for i in 0..54 {
            s_a.as_ptr().cast::<u8>().add(i).write(i as u8);
        }
        for i in 0..54 {
            assert_eq!(*s_a.as_ptr().cast::<u8>().add(i), i as u8);
        }

        a.free(s_a);
        b.free(s_b);

        shutdown();
    }
    assert_eq!(pagepool::stats::reserved_bytes(), 0);
    assert_eq!(pagepool::stats::committed_bytes(), 0);

    // After a shutdown the process can start a fresh allocator.
    startup(1).expect("restart");
    let a = get_allocator(0);
    unsafe {
        let slice = a.alloc::<u32>(8).unwrap();
        a.free(slice);
        shutdown();
    }
    assert_eq!(pagepool::stats::reserved_bytes(), 0);
}
