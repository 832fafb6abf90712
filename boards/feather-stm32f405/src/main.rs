#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;
use timer_core::SharedState;

mod device_id;
mod display;
mod network;
mod time;

stm32_tim2_monotonic!(Mono, 1_000_000);

/// Timer configuration, clock offset and link status. Written by the
/// network task, read by the render task.
static STATE: SharedState<CriticalSectionRawMutex> = SharedState::new();

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART1, USART2, USART3])]
mod app {
    use super::*;
    use defmt::{info, warn};
    use embassy_futures::select::{select3, Either3};
    use embassy_stm32::exti::ExtiInput;
    use embassy_stm32::gpio::{Level, Output, Pull, Speed};
    use embassy_stm32::peripherals;
    use embassy_stm32::rcc::{
        AHBPrescaler, APBPrescaler, Hse, HseMode, Pll, PllMul, PllPDiv, PllPreDiv, PllQDiv,
        PllSource, Sysclk,
    };
    use embassy_stm32::spi::{self, Spi};
    use embassy_stm32::time::Hertz;
    use timer_core::SyncedClock;

    use display::{ConsoleDisplay, DisplayConfig};
    use network::{manager, NetworkClient, NetworkConfig, ServerConfig, TimerClient};

    type SpiPeripheral = embassy_stm32::Peri<'static, peripherals::SPI2>;
    type PinPB13 = embassy_stm32::Peri<'static, peripherals::PB13>;
    type PinPB15 = embassy_stm32::Peri<'static, peripherals::PB15>;
    type PinPB14 = embassy_stm32::Peri<'static, peripherals::PB14>;
    type PinPC6 = embassy_stm32::Peri<'static, peripherals::PC6>;
    type PinPC3 = embassy_stm32::Peri<'static, peripherals::PC3>;
    type PinPC2 = embassy_stm32::Peri<'static, peripherals::PC2>;
    type ExtiChannel = embassy_stm32::Peri<'static, peripherals::EXTI2>;
    type DmaTx = embassy_stm32::Peri<'static, peripherals::DMA1_CH4>;
    type DmaRx = embassy_stm32::Peri<'static, peripherals::DMA1_CH3>;
    type RngPeripheral = embassy_stm32::Peri<'static, peripherals::RNG>;

    struct NetworkPeripherals {
        spi: SpiPeripheral,
        sck: PinPB13,
        mosi: PinPB15,
        miso: PinPB14,
        cs: PinPC6,
        reset: PinPC3,
        int: PinPC2,
        exti: ExtiChannel,
        dma_tx: DmaTx,
        dma_rx: DmaRx,
    }

    // RNG interrupt binding for hardware random number generator
    embassy_stm32::bind_interrupts!(struct RngIrqs {
        RNG => embassy_stm32::rng::InterruptHandler<peripherals::RNG>;
    });

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        led: Output<'static>,
    }

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("Countdown display starting...");

        // 12 MHz crystal -> 336 MHz VCO; P = 84 MHz SYSCLK, Q = 48 MHz for the RNG
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });
        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV6,
            mul: PllMul::MUL168,
            divp: Some(PllPDiv::DIV4),
            divq: Some(PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV2;
        config.rcc.apb2_pre = APBPrescaler::DIV1;

        let p = embassy_stm32::init(config);

        // APB1 is divided, so TIM2 runs at twice its 42 MHz
        Mono::start(84_000_000);
        info!("Clocks up: SYSCLK 84 MHz, monotonic at 1 MHz");

        let led = Output::new(p.PC1, Level::High, Speed::Low);

        let net_periph = NetworkPeripherals {
            spi: p.SPI2,
            sck: p.PB13,
            mosi: p.PB15,
            miso: p.PB14,
            cs: p.PC6,
            reset: p.PC3,
            int: p.PC2,
            exti: p.EXTI2,
            dma_tx: p.DMA1_CH4,
            dma_rx: p.DMA1_CH3,
        };

        heartbeat::spawn().ok();
        render_task::spawn().ok();
        network_task::spawn(net_periph, p.RNG).ok();

        (Shared {}, Local { led })
    }

    /// Heartbeat task
    ///
    /// Slow blink while the timer server is connected, fast blink otherwise.
    #[task(priority = 1, local = [led])]
    async fn heartbeat(cx: heartbeat::Context) {
        info!("Heartbeat task started");
        loop {
            let period_ms: u64 = if STATE.is_server_connected() { 5000 } else { 1000 };
            cx.local.led.set_high();
            Mono::delay(100_u64.millis()).await;
            cx.local.led.set_low();
            Mono::delay((period_ms - 100).millis()).await;
        }
    }

    /// Render task - one frame per tick from the shared state
    ///
    /// Runs above the network task so a burst of inbound frames cannot
    /// delay the countdown.
    #[task(priority = 2)]
    async fn render_task(_cx: render_task::Context) {
        let config = DisplayConfig::default();
        let clock = SyncedClock::new(time::Uptime, &STATE);
        let mut display = ConsoleDisplay::new();
        info!("Render task started ({} ms tick)", config.tick_ms);

        loop {
            timer_core::render(&STATE, &clock, &mut display, config.utc_offset_hours);
            Mono::delay(config.tick_ms.millis()).await;
        }
    }

    /// Network task - owns the network stack and the timer server session
    ///
    /// Stack is !Send and must remain within this task.
    #[task(priority = 1)]
    async fn network_task(
        _cx: network_task::Context,
        periph: NetworkPeripherals,
        rng_periph: RngPeripheral,
    ) -> ! {
        use embassy_net::{Config, StackResources};
        use static_cell::StaticCell;

        info!("Network task started");

        // Setup ethernet peripherals
        let mut spi_config = spi::Config::default();
        spi_config.frequency = Hertz(10_000_000); // 10 MHz for W5500

        let spi = Spi::new(
            periph.spi,
            periph.sck,
            periph.mosi,
            periph.miso,
            periph.dma_tx,
            periph.dma_rx,
            spi_config,
        );

        let cs = Output::new(periph.cs, Level::High, Speed::VeryHigh);
        let reset = Output::new(periph.reset, Level::High, Speed::Low);
        let int = ExtiInput::new(periph.int, periph.exti, Pull::Up);

        let eth_periph = manager::EthPeripherals {
            spi,
            cs,
            reset,
            int,
        };

        let net_config = NetworkConfig::default();
        let (device, w5500_runner) = manager::init_w5500(eth_periph, net_config.mac_addr).await;

        static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
        let (stack, mut net_runner) = embassy_net::new(
            device,
            Config::dhcpv4(Default::default()),
            RESOURCES.init(StackResources::new()),
            net_config.seed,
        );
        info!("Network stack initialized with DHCP");

        let app_logic = run_timer_client(&stack, rng_periph);

        match select3(w5500_runner.run(), net_runner.run(), app_logic).await {
            Either3::First(never) => never,
            Either3::Second(never) => never,
            Either3::Third(never) => never,
        }
    }

    /// Keep a timer server session alive for as long as the device runs
    async fn run_timer_client(
        stack: &embassy_net::Stack<'static>,
        rng_periph: RngPeripheral,
    ) -> ! {
        use embassy_stm32::rng::Rng;

        let mut rng = Rng::new(rng_periph, RngIrqs);
        info!("Hardware RNG initialized");

        let server = ServerConfig::default();
        let reconnect_delay_ms = server.reconnect_delay_ms;
        info!("Timer id: {}", server.timer_id);
        let mut client = TimerClient::new(server, &STATE, &mut rng);

        loop {
            manager::wait_for_config(stack, &STATE).await;
            match client.run(stack).await {
                Ok(()) => info!("Timer session closed by server"),
                Err(e) => warn!("Timer session ended: {}", e),
            }
            Mono::delay(reconnect_delay_ms.millis()).await;
        }
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        info!("Idle task started - entering WFI loop");
        loop {
            cortex_m::asm::wfi();
        }
    }
}
