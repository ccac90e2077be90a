//! Complete system model.
//!
//! [`SocDescription`] is the loosely-typed form read from disk, with every
//! capability slot optional. [`SystemModel`] is the validated form consumed
//! by the build pipeline: required slots are plain fields, the optional SDRAM
//! is an `Option`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::bus::Bus;
use crate::cpu::Cpu;
use crate::error::{ModelError, Result};
use crate::intc::InterruptController;
use crate::periph::{
    Peripheral, PeripheralSlot, SdramPeripheral, SramPeripheral, TimerPeripheral, UartPeripheral,
};

fn default_name() -> String {
    "soc".to_string()
}

/// Serde form of a `.soc.toml` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SocDescription {
    /// SoC name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Clock frequency in Hz.
    pub clk_freq: Option<u64>,
    pub cpu: Option<Cpu>,
    pub intc: Option<InterruptController>,
    pub rom: Option<SramPeripheral>,
    pub ram: Option<SramPeripheral>,
    pub sdram: Option<SdramPeripheral>,
    pub uart: Option<UartPeripheral>,
    pub timer: Option<TimerPeripheral>,
    #[serde(default)]
    pub bus: Bus,
}

impl Default for SocDescription {
    fn default() -> Self {
        Self {
            name: default_name(),
            cpu: None,
            intc: None,
            rom: None,
            ram: None,
            sdram: None,
            uart: None,
            timer: None,
            clk_freq: None,
            bus: Bus::default(),
        }
    }
}

impl SocDescription {
    /// A Minerva SoC with 8 KiB ROM, 4 KiB RAM, a UART and a timer.
    pub fn example_minerva() -> Self {
        let mut intc = InterruptController::new("intc");
        intc.lines.insert("timer".into(), 0);
        intc.lines.insert("uart".into(), 1);

        let mut bus = Bus::default();
        bus.attach("rom", 0x0000_0000);
        bus.attach("ram", 0x0000_4000);
        bus.attach("uart", 0x0000_5000);
        bus.attach("timer", 0x0000_6000);

        Self {
            name: "minerva-soc".into(),
            cpu: Some(Cpu::minerva()),
            intc: Some(intc),
            rom: Some(SramPeripheral::new("rom", 0x2000, false)),
            ram: Some(SramPeripheral::new("ram", 0x1000, true)),
            sdram: None,
            uart: Some(UartPeripheral {
                name: "uart".into(),
                size: 0x1000,
                irq: "uart".into(),
            }),
            timer: Some(TimerPeripheral {
                name: "timer".into(),
                size: 0x1000,
                width: 32,
                irq: "timer".into(),
            }),
            clk_freq: Some(100_000_000),
            bus,
        }
    }

    /// Add an SDRAM peripheral attached at `base`.
    pub fn with_sdram(mut self, sdram: SdramPeripheral, base: u64) -> Self {
        self.bus.attach(sdram.name.clone(), base);
        self.sdram = Some(sdram);
        self
    }

    /// Required capabilities that are absent, in declaration order.
    pub fn missing_capabilities(&self) -> Vec<String> {
        let slots: [(&str, bool); 7] = [
            ("cpu", self.cpu.is_some()),
            ("intc", self.intc.is_some()),
            ("rom", self.rom.is_some()),
            ("ram", self.ram.is_some()),
            ("uart", self.uart.is_some()),
            ("timer", self.timer.is_some()),
            ("clk-freq", self.clk_freq.is_some()),
        ];
        slots
            .iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

/// A validated CPU SoC.
///
/// Immutable apart from [`SystemModel::set_rom_init`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemModel {
    name: String,
    cpu: Cpu,
    intc: InterruptController,
    rom: SramPeripheral,
    ram: SramPeripheral,
    sdram: Option<SdramPeripheral>,
    uart: UartPeripheral,
    timer: TimerPeripheral,
    clk_freq: u64,
    bus: Bus,
}

impl SystemModel {
    /// Validate a description and build the model from it.
    ///
    /// Every missing required slot is reported in a single
    /// [`ModelError::InvalidModel`].
    pub fn from_description(desc: SocDescription) -> Result<Self> {
        let missing = desc.missing_capabilities();
        let (Some(cpu), Some(intc), Some(rom), Some(ram), Some(uart), Some(timer), Some(clk_freq)) = (
            desc.cpu,
            desc.intc,
            desc.rom,
            desc.ram,
            desc.uart,
            desc.timer,
            desc.clk_freq,
        ) else {
            return Err(ModelError::InvalidModel { missing });
        };

        if !cpu.has_valid_data_width() {
            return Err(ModelError::Validation {
                detail: format!(
                    "CPU data width {} is not a whole number of bytes between 8 and 64",
                    cpu.data_width
                ),
            });
        }
        if let Some(index) = intc.duplicate_indices().first() {
            return Err(ModelError::Validation {
                detail: format!("interrupt index {index} is assigned to more than one line"),
            });
        }
        if clk_freq == 0 {
            return Err(ModelError::Validation {
                detail: "clock frequency must be non-zero".into(),
            });
        }

        let model = Self {
            name: desc.name,
            cpu,
            intc,
            rom,
            ram,
            sdram: desc.sdram,
            uart,
            timer,
            clk_freq,
            bus: desc.bus,
        };
        // Addresses resolve by instance name, so names must be unique.
        let mut names = BTreeSet::new();
        for slot in PeripheralSlot::ALL {
            let Some(periph) = model.peripheral(slot) else {
                continue;
            };
            if !names.insert(periph.name()) {
                return Err(ModelError::Validation {
                    detail: format!(
                        "peripheral name '{}' is used more than once (again by {slot})",
                        periph.name()
                    ),
                });
            }
        }

        let capacity = model.rom_capacity();
        if model.rom.init.len() as u64 > capacity {
            return Err(ModelError::InitTooLarge {
                words: model.rom.init.len(),
                capacity,
            });
        }
        Ok(model)
    }

    /// Convert back to the serde form, including any ROM init data.
    pub fn to_description(&self) -> SocDescription {
        SocDescription {
            name: self.name.clone(),
            cpu: Some(self.cpu.clone()),
            intc: Some(self.intc.clone()),
            rom: Some(self.rom.clone()),
            ram: Some(self.ram.clone()),
            sdram: self.sdram.clone(),
            uart: Some(self.uart.clone()),
            timer: Some(self.timer.clone()),
            clk_freq: Some(self.clk_freq),
            bus: self.bus.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn intc(&self) -> &InterruptController {
        &self.intc
    }

    pub fn rom(&self) -> &SramPeripheral {
        &self.rom
    }

    pub fn ram(&self) -> &SramPeripheral {
        &self.ram
    }

    pub fn sdram(&self) -> Option<&SdramPeripheral> {
        self.sdram.as_ref()
    }

    pub fn uart(&self) -> &UartPeripheral {
        &self.uart
    }

    pub fn timer(&self) -> &TimerPeripheral {
        &self.timer
    }

    /// Clock frequency in Hz.
    pub fn clk_freq(&self) -> u64 {
        self.clk_freq
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// The peripheral in `slot`, or `None` for an empty optional slot.
    pub fn peripheral(&self, slot: PeripheralSlot) -> Option<&dyn Peripheral> {
        match slot {
            PeripheralSlot::Rom => Some(&self.rom),
            PeripheralSlot::Ram => Some(&self.ram),
            PeripheralSlot::Sdram => self.sdram.as_ref().map(|p| p as &dyn Peripheral),
            PeripheralSlot::Uart => Some(&self.uart),
            PeripheralSlot::Timer => Some(&self.timer),
        }
    }

    fn present(&self, slot: PeripheralSlot) -> Result<&dyn Peripheral> {
        self.peripheral(slot)
            .ok_or_else(|| ModelError::AbsentPeripheral {
                slot: slot.as_str().to_string(),
            })
    }

    /// Base address of the peripheral in `slot`, resolved through the bus.
    pub fn periph_addr(&self, slot: PeripheralSlot) -> Result<u64> {
        let periph = self.present(slot)?;
        self.bus.address_of(periph.name())
    }

    /// Size in bytes of the peripheral in `slot`.
    pub fn periph_size(&self, slot: PeripheralSlot) -> Result<u64> {
        Ok(self.present(slot)?.size())
    }

    /// Interrupt controller index of the line owned by the peripheral in `slot`.
    pub fn irq_index(&self, slot: PeripheralSlot) -> Result<u32> {
        let periph = self.present(slot)?;
        let line = periph.irq().ok_or_else(|| ModelError::NoInterrupt {
            peripheral: periph.name().to_string(),
        })?;
        self.intc.find_index(line)
    }

    /// Number of data words the ROM holds.
    pub fn rom_capacity(&self) -> u64 {
        self.rom.depth(self.cpu.word_bytes())
    }

    /// Replace the ROM initialization data.
    pub fn set_rom_init(&mut self, words: Vec<u64>) -> Result<()> {
        let capacity = self.rom_capacity();
        if words.len() as u64 > capacity {
            return Err(ModelError::InitTooLarge {
                words: words.len(),
                capacity,
            });
        }
        self.rom.init = words;
        Ok(())
    }
}

impl TryFrom<SocDescription> for SystemModel {
    type Error = ModelError;

    fn try_from(desc: SocDescription) -> Result<Self> {
        Self::from_description(desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periph::{CacheConfig, SdramCore};

    fn sdram() -> SdramPeripheral {
        SdramPeripheral {
            name: "sdram".into(),
            size: 0x1000_0000,
            core: SdramCore {
                name: "ecpix5".into(),
                size: 0x1000_0000,
            },
            cache: CacheConfig { size: 8192 },
        }
    }

    #[test]
    fn example_is_valid() {
        let model = SystemModel::from_description(SocDescription::example_minerva()).unwrap();
        assert_eq!(model.clk_freq(), 100_000_000);
        assert!(model.sdram().is_none());
        assert_eq!(model.periph_addr(PeripheralSlot::Uart).unwrap(), 0x5000);
        assert_eq!(model.periph_size(PeripheralSlot::Rom).unwrap(), 0x2000);
        assert_eq!(model.irq_index(PeripheralSlot::Uart).unwrap(), 1);
        assert_eq!(model.irq_index(PeripheralSlot::Timer).unwrap(), 0);
        assert_eq!(model.rom_capacity(), 0x800);
    }

    #[test]
    fn missing_ram_is_invalid() {
        let mut desc = SocDescription::example_minerva();
        desc.ram = None;
        let err = SystemModel::from_description(desc).unwrap_err();
        match err {
            ModelError::InvalidModel { missing } => assert_eq!(missing, vec!["ram"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn all_missing_reported_together() {
        let err = SystemModel::from_description(SocDescription::default()).unwrap_err();
        match err {
            ModelError::InvalidModel { missing } => {
                assert_eq!(
                    missing,
                    vec!["cpu", "intc", "rom", "ram", "uart", "timer", "clk-freq"]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn absent_sdram_lookups_fail() {
        let model = SystemModel::from_description(SocDescription::example_minerva()).unwrap();
        let err = model.periph_addr(PeripheralSlot::Sdram).unwrap_err();
        assert!(matches!(err, ModelError::AbsentPeripheral { .. }));
    }

    #[test]
    fn present_sdram_resolves() {
        let desc = SocDescription::example_minerva().with_sdram(sdram(), 0x4000_0000);
        let model = SystemModel::from_description(desc).unwrap();
        assert_eq!(model.periph_addr(PeripheralSlot::Sdram).unwrap(), 0x4000_0000);
    }

    #[test]
    fn unattached_peripheral_unresolved() {
        let mut desc = SocDescription::example_minerva();
        desc.bus.windows.retain(|w| w.peripheral != "timer");
        let model = SystemModel::from_description(desc).unwrap();
        let err = model.periph_addr(PeripheralSlot::Timer).unwrap_err();
        assert!(matches!(err, ModelError::UnresolvedPeripheral { ref peripheral } if peripheral == "timer"));
    }

    #[test]
    fn unregistered_irq_fails_lazily() {
        let mut desc = SocDescription::example_minerva();
        desc.intc.as_mut().unwrap().lines.remove("uart");
        let model = SystemModel::from_description(desc).unwrap();
        assert!(matches!(
            model.irq_index(PeripheralSlot::Uart).unwrap_err(),
            ModelError::UnregisteredInterrupt { .. }
        ));
        assert!(matches!(
            model.irq_index(PeripheralSlot::Rom).unwrap_err(),
            ModelError::NoInterrupt { .. }
        ));
    }

    #[test]
    fn bad_data_width_rejected() {
        let mut desc = SocDescription::example_minerva();
        desc.cpu.as_mut().unwrap().data_width = 12;
        assert!(matches!(
            SystemModel::from_description(desc).unwrap_err(),
            ModelError::Validation { .. }
        ));
    }

    #[test]
    fn duplicate_peripheral_names_rejected() {
        let mut desc = SocDescription::example_minerva();
        desc.ram.as_mut().unwrap().name = "rom".into();
        let err = SystemModel::from_description(desc).unwrap_err();
        assert!(
            matches!(err, ModelError::Validation { ref detail } if detail.contains("'rom'") && detail.contains("ram")),
            "{err}"
        );

        let desc = SocDescription::example_minerva().with_sdram(
            SdramPeripheral {
                name: "uart".into(),
                ..sdram()
            },
            0x4000_0000,
        );
        assert!(matches!(
            SystemModel::from_description(desc).unwrap_err(),
            ModelError::Validation { .. }
        ));
    }

    #[test]
    fn set_rom_init_replaces_and_checks_capacity() {
        let mut model = SystemModel::from_description(SocDescription::example_minerva()).unwrap();
        model.set_rom_init(vec![1, 2, 3]).unwrap();
        model.set_rom_init(vec![7]).unwrap();
        assert_eq!(model.rom().init, vec![7]);

        let too_many = vec![0; 0x801];
        assert!(matches!(
            model.set_rom_init(too_many).unwrap_err(),
            ModelError::InitTooLarge { capacity: 0x800, .. }
        ));
        assert_eq!(model.rom().init, vec![7]);
    }

    #[test]
    fn description_round_trip_keeps_init() {
        let mut model = SystemModel::from_description(SocDescription::example_minerva()).unwrap();
        model.set_rom_init(vec![0xdead_beef]).unwrap();
        let again = SystemModel::try_from(model.to_description()).unwrap();
        assert_eq!(again, model);
    }
}
