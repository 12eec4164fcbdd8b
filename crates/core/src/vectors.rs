// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! The exception/interrupt vector table.
//!
//! Slot `n` of the table is what the core fetches when exception number `n`
//! is taken, so order and length are dictated by the silicon: 16
//! architectural slots (SP, Reset, 14 exceptions with five reserved holes),
//! then one slot per device interrupt line.
//!
//! There is no weak-symbol aliasing. [`TrapTable::new`] fills every handler
//! slot with an explicit reference to the default handler, and overrides are
//! applied one slot at a time in `const` context, so the complete table is a
//! single value the compiler (and [`TrapTable::classify`]) can see.

use core::fmt;

/// Exception and interrupt handler.
pub type Handler = extern "C" fn();

/// Slot 1. Never returns.
pub type ResetHandler = unsafe extern "C" fn() -> !;

pub const EXCEPTION_SLOTS: usize = 16;
pub const INTERRUPT_SLOTS: usize = Interrupt::ALL.len();

/// Architectural slots that hold zero.
pub const RESERVED_SLOTS: [usize; 5] = [7, 8, 9, 10, 13];

/// Architectural exceptions that take a handler (everything in slots 2..16
/// except the reserved holes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Exception {
    NonMaskableInt = 2,
    HardFault = 3,
    MemoryManagement = 4,
    BusFault = 5,
    UsageFault = 6,
    SVCall = 11,
    DebugMonitor = 12,
    PendSV = 14,
    SysTick = 15,
}

impl Exception {
    pub const ALL: [Exception; 9] = [
        Exception::NonMaskableInt,
        Exception::HardFault,
        Exception::MemoryManagement,
        Exception::BusFault,
        Exception::UsageFault,
        Exception::SVCall,
        Exception::DebugMonitor,
        Exception::PendSV,
        Exception::SysTick,
    ];

    pub const fn vector(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Exception::NonMaskableInt => "NonMaskableInt",
            Exception::HardFault => "HardFault",
            Exception::MemoryManagement => "MemoryManagement",
            Exception::BusFault => "BusFault",
            Exception::UsageFault => "UsageFault",
            Exception::SVCall => "SVCall",
            Exception::DebugMonitor => "DebugMonitor",
            Exception::PendSV => "PendSV",
            Exception::SysTick => "SysTick",
        }
    }
}

macro_rules! interrupts {
    ($($name:ident),* $(,)?) => {
        /// Device interrupt lines, numbered from 0 in vendor table order.
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u8)]
        pub enum Interrupt {
            $($name,)*
        }

        impl Interrupt {
            pub const ALL: &'static [Interrupt] = &[$(Interrupt::$name,)*];
            const NAMES: &'static [&'static str] = &[$(stringify!($name),)*];

            pub const fn name(self) -> &'static str {
                Self::NAMES[self as usize]
            }
        }
    };
}

interrupts! {
    WWDG, PVD, TAMP_STAMP, RTC_WKUP, FLASH, RCC,
    EXTI0, EXTI1, EXTI2, EXTI3, EXTI4,
    DMA1_STREAM0, DMA1_STREAM1, DMA1_STREAM2, DMA1_STREAM3,
    DMA1_STREAM4, DMA1_STREAM5, DMA1_STREAM6,
    ADC, CAN1_TX, CAN1_RX0, CAN1_RX1, CAN1_SCE, EXTI9_5,
    TIM1_BRK_TIM9, TIM1_UP_TIM10, TIM1_TRG_COM_TIM11, TIM1_CC,
    TIM2, TIM3, TIM4,
    I2C1_EV, I2C1_ER, I2C2_EV, I2C2_ER,
    SPI1, SPI2, USART1, USART2, USART3,
    EXTI15_10, RTC_ALARM, OTG_FS_WKUP,
    TIM8_BRK_TIM12, TIM8_UP_TIM13, TIM8_TRG_COM_TIM14, TIM8_CC,
    DMA1_STREAM7, FMC, SDIO, TIM5, SPI3, UART4, UART5,
    TIM6_DAC, TIM7,
    DMA2_STREAM0, DMA2_STREAM1, DMA2_STREAM2, DMA2_STREAM3, DMA2_STREAM4,
    ETH, ETH_WKUP, CAN2_TX, CAN2_RX0, CAN2_RX1, CAN2_SCE, OTG_FS,
    DMA2_STREAM5, DMA2_STREAM6, DMA2_STREAM7,
    USART6, I2C3_EV, I2C3_ER,
    OTG_HS_EP1_OUT, OTG_HS_EP1_IN, OTG_HS_WKUP, OTG_HS,
    DCMI, CRYP, HASH_RNG, FPU,
    UART7, UART8, SPI4, SPI5, SPI6, SAI1,
    LTDC, LTDC_ER, DMA2D,
}

impl Interrupt {
    pub const fn vector(self) -> usize {
        EXCEPTION_SLOTS + self as usize
    }
}

/// Name of hardware slot `n`, `None` past the end of the table.
pub fn slot_name(n: usize) -> Option<&'static str> {
    match n {
        0 => Some("InitialStack"),
        1 => Some("Reset"),
        _ if RESERVED_SLOTS.contains(&n) => Some("Reserved"),
        2..=15 => Exception::ALL
            .iter()
            .find(|e| e.vector() == n)
            .map(|e| e.name()),
        _ => Interrupt::ALL.get(n - EXCEPTION_SLOTS).map(|i| i.name()),
    }
}

/// One handler-sized word of the table.
#[derive(Clone, Copy)]
#[repr(C)]
pub union Vector {
    handler: Handler,
    reserved: usize,
}

impl Vector {
    pub const RESERVED: Vector = Vector { reserved: 0 };

    pub const fn handler(handler: Handler) -> Self {
        Vector { handler }
    }

    pub fn address(&self) -> usize {
        // SAFETY: both variants are one pointer-sized integer.
        unsafe { self.reserved }
    }
}

impl fmt::Debug for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.address())
    }
}

/// What a slot holds, for audits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    InitialStack,
    Reset,
    Reserved,
    Default,
    Handler,
}

/// The hardware vector table, laid out word for word.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct TrapTable {
    initial_stack: *const u32,
    reset: ResetHandler,
    exceptions: [Vector; EXCEPTION_SLOTS - 2],
    interrupts: [Vector; INTERRUPT_SLOTS],
}

impl fmt::Debug for TrapTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.words().map(|reserved| Vector { reserved }))
            .finish()
    }
}

// The table lives in flash and is never written; the raw stack pointer is
// only ever read by the hardware.
unsafe impl Sync for TrapTable {}

impl TrapTable {
    pub const SLOTS: usize = EXCEPTION_SLOTS + INTERRUPT_SLOTS;

    /// Every handler slot points at `default`, reserved slots are zero.
    pub const fn new(initial_stack: *const u32, reset: ResetHandler, default: Handler) -> Self {
        let mut exceptions = [Vector::handler(default); EXCEPTION_SLOTS - 2];
        let mut i = 0;
        while i < RESERVED_SLOTS.len() {
            exceptions[RESERVED_SLOTS[i] - 2] = Vector::RESERVED;
            i += 1;
        }
        Self {
            initial_stack,
            reset,
            exceptions,
            interrupts: [Vector::handler(default); INTERRUPT_SLOTS],
        }
    }

    pub const fn with_exception(mut self, exception: Exception, handler: Handler) -> Self {
        self.exceptions[exception.vector() - 2] = Vector::handler(handler);
        self
    }

    pub const fn with_interrupt(mut self, interrupt: Interrupt, handler: Handler) -> Self {
        self.interrupts[interrupt as usize] = Vector::handler(handler);
        self
    }

    /// Raw content of slot `n`, as the core would fetch it.
    pub fn word(&self, n: usize) -> Option<usize> {
        match n {
            0 => Some(self.initial_stack as usize),
            1 => Some(self.reset as usize),
            2..=15 => Some(self.exceptions[n - 2].address()),
            _ => self.interrupts.get(n - EXCEPTION_SLOTS).map(Vector::address),
        }
    }

    pub fn words(&self) -> impl Iterator<Item = usize> + '_ {
        (0..Self::SLOTS).filter_map(move |n| self.word(n))
    }

    /// Kind of every slot, in hardware order, judged against `default`.
    pub fn classify(&self, default: Handler) -> impl Iterator<Item = SlotKind> + '_ {
        let default = default as usize;
        self.words().enumerate().map(move |(n, word)| match n {
            0 => SlotKind::InitialStack,
            1 => SlotKind::Reset,
            _ if RESERVED_SLOTS.contains(&n) => SlotKind::Reserved,
            _ if word == default => SlotKind::Default,
            _ => SlotKind::Handler,
        })
    }
}
