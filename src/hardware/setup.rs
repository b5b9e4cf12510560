use log::info;
use rtt_logger::RTTLogger;

use super::hal::{
    gpio::PinState,
    pac,
    prelude::*,
    serial::{self, Serial},
    spi::{Mode, Phase, Polarity, Spi},
};
use super::{uart::FrameLink, Adc, Systick};
use crate::ads1256::{self, ActiveLow, Ads1256, NoChipSelect, Pins};
use crate::delay::TimerDelay;
use crate::frame::FRAME_LEN;
use crate::metadata::ApplicationMetadata;
use crate::settings::Settings;

/// SPI mode 1: clock idles low, data captured on the falling edge.
const ADC_SPI_MODE: Mode = Mode {
    polarity: Polarity::IdleLow,
    phase: Phase::CaptureOnSecondTransition,
};

pub struct Dt35Devices {
    pub adc: Adc,
    pub link: FrameLink,
    pub settings: Settings,
    pub metadata: ApplicationMetadata,
}

pub fn setup(core: rtic::export::Peripherals, device: pac::Peripherals) -> Dt35Devices {
    static LOGGER: RTTLogger = RTTLogger::new(log::LevelFilter::Trace);
    rtt_target::rtt_init_print!();
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(log::LevelFilter::Trace))
        .unwrap();
    info!("---Starting Hardware Setup");

    let settings = Settings::load();

    let mut flash = device.FLASH.constrain();
    let rcc = device.RCC.constrain();
    let clocks = rcc
        .cfgr
        .use_hse(8.MHz())
        .sysclk(72.MHz())
        .pclk1(36.MHz())
        .freeze(&mut flash.acr);

    Systick::start(core.SYST, clocks.sysclk().raw());

    let mut afio = device.AFIO.constrain();
    let mut gpioa = device.GPIOA.split();

    // ADS1256 on SPI1. fCLKIN is 7.68 MHz, so SCLK must stay below 1.92 MHz.
    let sck = gpioa.pa5.into_alternate_push_pull(&mut gpioa.crl);
    let miso = gpioa.pa6.into_floating_input(&mut gpioa.crl);
    let mosi = gpioa.pa7.into_alternate_push_pull(&mut gpioa.crl);
    let spi = Spi::spi1(
        device.SPI1,
        (sck, miso, mosi),
        &mut afio.mapr,
        ADC_SPI_MODE,
        1.MHz(),
        clocks,
    );

    let pins = Pins {
        cs: NoChipSelect,
        drdy: ActiveLow(gpioa.pa3.into_pull_up_input(&mut gpioa.crl)),
        reset: gpioa
            .pa4
            .into_push_pull_output_with_state(&mut gpioa.crl, PinState::High),
    };
    let delay = TimerDelay::new(device.TIM3.counter_us(&clocks));

    let adc = Ads1256::new(spi, pins, delay, ads1256::Config::from(&settings)).unwrap();
    info!("ADC initialized");

    // Frames leave on USART1 through DMA1 channel 4.
    let tx = gpioa.pa9.into_alternate_push_pull(&mut gpioa.crh);
    let rx = gpioa.pa10;
    let serial = Serial::new(
        device.USART1,
        (tx, rx),
        &mut afio.mapr,
        serial::Config::default().baudrate(settings.baudrate.bps()),
        &clocks,
    );
    let dma = device.DMA1.split();
    let buffer = cortex_m::singleton!(: [u8; FRAME_LEN] = [0; FRAME_LEN]).unwrap();
    let (tx, _) = serial.split();
    let link = FrameLink::new(tx.with_dma(dma.4), buffer);

    let metadata = ApplicationMetadata::new();
    info!("{:?}", metadata);
    info!("{:?}", settings);
    info!("--- Hardware setup done");

    Dt35Devices {
        adc,
        link,
        settings,
        metadata,
    }
}
