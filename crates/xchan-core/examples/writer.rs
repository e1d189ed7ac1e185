//! Publishes a sequence of frames on "/xchan_demo".
//!
//! Run the reader example in another terminal to consume them:
//!
//! cargo run --example writer

use std::thread;
use std::time::Duration;

use xchan_core::{Channel, Frame, WriteStatus};

type Rgb = Frame<u8, { 100 * 100 * 3 }>;

fn main() -> xchan_core::Result<()> {
    let channel: Channel<Rgb> = Channel::attach("/xchan_demo")?;
    println!("writer attached (created: {})", channel.created());

    for shade in (0u8..=250).step_by(25) {
        let frame = Rgb::filled(100, 100, 3, shade);
        match channel.write(&frame) {
            WriteStatus::Success => println!("published frame with shade {}", shade),
            WriteStatus::Failure => println!("channel went away, stopping"),
        }
        thread::sleep(Duration::from_millis(500));
    }

    Ok(())
}
