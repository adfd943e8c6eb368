//! Two enclaves allocating at the same time on different threads. Each
//! enclave has its own pools, so there is no lock anywhere in this program.

use std::thread;

use pagepool::{get_allocator, shutdown, startup};

fn churn(enclave: usize) -> usize {
    let allocator = get_allocator(enclave);
    let mut first = 0usize;

    unsafe {
        for round in 0..10_000 {
            let slice = allocator.alloc::<u64>(8).expect("allocation failed");
            if round == 0 {
                first = slice.as_ptr().cast::<u64>() as usize;
            }
            slice.as_ptr().cast::<u64>().write(round);
            allocator.free(slice);
        }
    }

    first
}

fn main() {
    startup(2).expect("startup failed");

    let t1 = thread::spawn(|| churn(0));
    let t2 = thread::spawn(|| churn(1));

    let base1 = t1.join().unwrap();
    let base2 = t2.join().unwrap();

    println!("Enclave 0 allocated at {base1:#x}");
    println!("Enclave 1 allocated at {base2:#x}");
    println!(
        "Reserved {} GiB, committed {} KiB",
        pagepool::stats::reserved_bytes() >> 30,
        pagepool::stats::committed_bytes() >> 10
    );

    unsafe { shutdown() };
}
