//! Consumes frames published on "/xchan_demo" by the writer example.
//!
//! cargo run --example reader

use xchan_core::{Channel, Frame};

type Rgb = Frame<u8, { 100 * 100 * 3 }>;

fn main() -> xchan_core::Result<()> {
    let channel: Channel<Rgb> = Channel::attach("/xchan_demo")?;
    println!("reader attached (created: {})", channel.created());

    for n in 0..10 {
        let frame = channel.read()?;
        println!(
            "frame {}: {}x{}x{}, first pixel {}",
            n,
            frame.width(),
            frame.height(),
            frame.channels(),
            frame.at(0, 0, 0)
        );
    }

    Ok(())
}
