use std::ptr::NonNull;

use pagepool::{get_allocator, shutdown, startup};

fn log_alloc(slice: NonNull<[u8]>) {
    println!("Requested {} bytes of memory", slice.len());
    println!("Received this address: {:?}", slice.as_ptr());
}

fn main() {
    startup(1).expect("startup failed");

    let allocator = get_allocator(0);

    unsafe {
        let s1 = allocator.alloc::<u8>(24).unwrap();
        log_alloc(s1);

        let s2 = allocator.alloc::<u8>(64).unwrap();
        log_alloc(s2);

        let s3 = allocator.alloc::<u8>(1024).unwrap();
        log_alloc(s3);

        println!("Deallocating everything...");
        allocator.free(s1);
        allocator.free(s2);
        allocator.free(s3);

        shutdown();
    }
}
