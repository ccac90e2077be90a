//! The values a template sees.
//!
//! [`RenderContext`] is serialized into a [`ContextView`]: the model's
//! attributes under `soc`, the run name, the build directory, the banner and
//! every extra parameter as a top-level string. Each peripheral carries its
//! `slot` so that `periph_addr` and `irq_index` can find it in the model.

use std::collections::BTreeMap;
use std::sync::Arc;

use minijinja::{Environment, Error, ErrorKind, Value};
use serde::Serialize;
use socgen_model::{ModelError, Peripheral, PeripheralSlot, SystemModel};

/// Names bound by the renderer itself; extra parameters may not use them.
pub const RESERVED_NAMES: [&str; 4] = ["soc", "name", "build_dir", "autogenerated"];

/// Functions callable from every template.
pub const FUNCTIONS: [&str; 5] = ["hex", "upper", "lower", "periph_addr", "irq_index"];

/// Everything a template can reference.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub model: &'a SystemModel,
    /// Run name.
    pub name: &'a str,
    pub build_dir: &'a str,
    /// Banner line for generated files.
    pub autogenerated: &'a str,
    /// Extra parameters such as `software_dir` and `litedram_dir`.
    pub params: &'a BTreeMap<String, String>,
}

impl<'a> RenderContext<'a> {
    pub fn view(&self) -> ContextView<'a> {
        ContextView {
            soc: SocView::new(self.model),
            name: self.name,
            build_dir: self.build_dir,
            autogenerated: self.autogenerated,
            params: self.params,
        }
    }
}

/// Serialized form of a [`RenderContext`].
#[derive(Debug, Serialize)]
pub struct ContextView<'a> {
    soc: SocView<'a>,
    name: &'a str,
    build_dir: &'a str,
    autogenerated: &'a str,
    #[serde(flatten)]
    params: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct SocView<'a> {
    name: &'a str,
    clk_freq: u64,
    cpu: CpuView<'a>,
    intc: IntcView<'a>,
    rom: PeripheralView<'a>,
    ram: PeripheralView<'a>,
    sdram: Option<PeripheralView<'a>>,
    uart: PeripheralView<'a>,
    timer: PeripheralView<'a>,
}

#[derive(Debug, Serialize)]
struct CpuView<'a> {
    name: &'a str,
    arch: &'a str,
    data_width: u32,
    byteorder: &'static str,
    reset_addr: u64,
    muldiv: &'static str,
}

#[derive(Debug, Serialize)]
struct IntcView<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct SizeView<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    size: u64,
}

/// One peripheral. Attributes a kind lacks stay undefined.
#[derive(Debug, Serialize)]
struct PeripheralView<'a> {
    slot: &'static str,
    name: &'a str,
    size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    irq: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    writable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    core: Option<SizeView<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache: Option<SizeView<'a>>,
}

impl<'a> PeripheralView<'a> {
    fn new(slot: PeripheralSlot, periph: &'a dyn Peripheral) -> Self {
        PeripheralView {
            slot: slot.as_str(),
            name: periph.name(),
            size: periph.size(),
            irq: periph.irq(),
            writable: None,
            width: None,
            core: None,
            cache: None,
        }
    }
}

impl<'a> SocView<'a> {
    fn new(model: &'a SystemModel) -> Self {
        let cpu = model.cpu();
        let rom = model.rom();
        let ram = model.ram();
        SocView {
            name: model.name(),
            clk_freq: model.clk_freq(),
            cpu: CpuView {
                name: &cpu.name,
                arch: &cpu.arch,
                data_width: cpu.data_width,
                byteorder: cpu.byteorder.as_str(),
                reset_addr: cpu.reset_addr,
                muldiv: cpu.muldiv.as_str(),
            },
            intc: IntcView {
                name: &model.intc().name,
            },
            rom: PeripheralView {
                writable: Some(rom.writable),
                ..PeripheralView::new(PeripheralSlot::Rom, rom)
            },
            ram: PeripheralView {
                writable: Some(ram.writable),
                ..PeripheralView::new(PeripheralSlot::Ram, ram)
            },
            sdram: model.sdram().map(|sdram| PeripheralView {
                core: Some(SizeView {
                    name: Some(&sdram.core.name),
                    size: sdram.core.size,
                }),
                cache: Some(SizeView {
                    name: None,
                    size: sdram.cache.size,
                }),
                ..PeripheralView::new(PeripheralSlot::Sdram, sdram)
            }),
            uart: PeripheralView::new(PeripheralSlot::Uart, model.uart()),
            timer: PeripheralView {
                width: Some(model.timer().width),
                ..PeripheralView::new(PeripheralSlot::Timer, model.timer())
            },
        }
    }
}

/// `0x` followed by lowercase hex digits.
pub fn hex(value: u64) -> String {
    format!("{value:#x}")
}

fn upper(value: &str) -> String {
    value.to_uppercase()
}

fn lower(value: &str) -> String {
    value.to_lowercase()
}

/// Register the context-independent functions and the `hex` filter.
pub fn add_builtins(env: &mut Environment<'_>) {
    env.add_filter("hex", hex);
    env.add_function("hex", hex);
    env.add_function("upper", upper);
    env.add_function("lower", lower);
}

/// Register `periph_addr` and `irq_index` against `model`.
///
/// A failed lookup keeps the [`ModelError`] as the error's source so the
/// caller can report its kind.
pub fn add_model_functions(env: &mut Environment<'_>, model: Arc<SystemModel>) {
    let addr_model = Arc::clone(&model);
    env.add_function("periph_addr", move |periph: Value| -> Result<u64, Error> {
        let slot = slot_of(&periph)?;
        addr_model.periph_addr(slot).map_err(model_failure)
    });
    env.add_function("irq_index", move |periph: Value| -> Result<u32, Error> {
        let slot = slot_of(&periph)?;
        model.irq_index(slot).map_err(model_failure)
    });
}

fn slot_of(periph: &Value) -> Result<PeripheralSlot, Error> {
    let slot = periph.get_attr("slot").ok().filter(|v| !v.is_undefined());
    slot.as_ref()
        .and_then(Value::as_str)
        .and_then(PeripheralSlot::from_name)
        .ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("expected a peripheral, got {}", periph.kind()),
            )
        })
}

fn model_failure(err: ModelError) -> Error {
    Error::new(ErrorKind::InvalidOperation, err.to_string()).with_source(err)
}

/// The [`ModelError`] behind a failed render, if a model function raised it.
pub fn model_error(err: &Error) -> Option<&ModelError> {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(model_err) = cause.downcast_ref::<ModelError>() {
            return Some(model_err);
        }
        source = cause.source();
    }
    None
}
