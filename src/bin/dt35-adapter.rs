//! # DT35 Adapter
//!
//! Firmware for the DT35 adapter board: four differential channels of an ADS1256
//! streamed as fixed size frames over a UART.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
use panic_probe as _; // global panic handler

#[cfg(not(target_os = "none"))]
fn main() {
    use dt35_adapter::{metadata::ApplicationMetadata, settings::Settings};

    let settings: heapless::String<512> =
        serde_json_core::to_string(&Settings::load()).unwrap();
    println!("{}", settings);
    let metadata: heapless::String<512> =
        serde_json_core::to_string(&ApplicationMetadata::new()).unwrap();
    println!("{}", metadata);
}

#[cfg(target_os = "none")]
#[rtic::app(device = dt35_adapter::hardware::hal::pac, peripherals = true, dispatchers = [EXTI0])]
mod app {
    use dt35_adapter::{
        frame::{Framer, Outcome},
        hardware::{setup::setup, uart::FrameLink, Adc, Systick},
        scan::Scanner,
    };
    use fugit::ExtU32;
    use rtic_monotonics::Monotonic;

    #[shared]
    struct Shared {
        scanner: Scanner<Adc>,
    }

    #[local]
    struct Local {
        link: FrameLink,
        framer: Framer,
        scan_period: u32,
        transmit_period: u32,
    }

    #[init]
    fn init(c: init::Context) -> (Shared, Local) {
        let dt35 = setup(c.core, c.device);

        let local = Local {
            link: dt35.link,
            framer: Framer::new(dt35.settings.layout, dt35.settings.gate_until_stable),
            scan_period: dt35.settings.scan_period_ms,
            transmit_period: dt35.settings.transmit_period_ms,
        };

        let shared = Shared {
            scanner: Scanner::new(dt35.adc),
        };

        scan::spawn().unwrap();
        transmit::spawn().unwrap();

        (shared, local)
    }

    // Both tasks run at the same priority and never preempt each other.
    #[task(priority = 1, shared=[scanner], local=[scan_period])]
    async fn scan(mut c: scan::Context) {
        loop {
            c.shared.scanner.lock(|scanner| {
                if let Err(e) = scanner.scan() {
                    log::error!("Scan failed: {:?}", e);
                }
            });
            Systick::delay((*c.local.scan_period).millis()).await;
        }
    }

    #[task(priority = 1, shared=[scanner], local=[link, framer, transmit_period])]
    async fn transmit(mut c: transmit::Context) {
        loop {
            let (data, stable, bus_errors) = c
                .shared
                .scanner
                .lock(|scanner| (*scanner.data(), scanner.is_stable(), scanner.adc().bus_errors()));
            let outcome = c.local.framer.publish(c.local.link, &data, stable);
            if outcome == Outcome::Sent && c.local.framer.sent() % 1000 == 1 {
                log::debug!(
                    "Frames sent {}, dropped {}, withheld {}, bus errors {}",
                    c.local.framer.sent(),
                    c.local.framer.dropped(),
                    c.local.framer.withheld(),
                    bus_errors
                );
            }
            Systick::delay((*c.local.transmit_period).millis()).await;
        }
    }
}
