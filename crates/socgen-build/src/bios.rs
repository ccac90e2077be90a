//! BIOS builder templates.
//!
//! Generates the Kconfig-style `{{name}}.config` and `litex_config.h` read by
//! the BIOS firmware tree, and the `make` invocation that builds it. The
//! command expects the `software_dir` parameter, plus `litedram_dir` when the
//! SoC has SDRAM.

use crate::plan::PlanBuilder;
use crate::registry::TemplateRegistry;

/// Path template of the firmware configuration file.
pub const CONFIG_PATH: &str = "{{name}}.config";

/// Path of the generated C header.
pub const HEADER_PATH: &str = "litex_config.h";

/// Firmware binary produced by the BIOS build, relative to the build directory.
pub const FIRMWARE_PATH: &str = "bios/bios.bin";

pub const CONFIG_TEMPLATE: &str = r#"
    # {{autogenerated}}
    CONFIG_CPU_{{upper(soc.cpu.name)}}=y
    CONFIG_CPU_RESET_ADDR={{hex(soc.cpu.reset_addr)}}
    CONFIG_CPU_BYTEORDER="{{soc.cpu.byteorder}}"
    CONFIG_ARCH_{{upper(soc.cpu.arch)}}=y
    {% if soc.cpu.muldiv == "soft" %}
    CONFIG_{{upper(soc.cpu.arch)}}_MULDIV_SOFT=y
    {% else %}
    CONFIG_{{upper(soc.cpu.arch)}}_MULDIV_SOFT=n
    {% endif %}
    CONFIG_ROM_START={{hex(periph_addr(soc.rom))}}
    CONFIG_ROM_SIZE={{hex(soc.rom.size)}}
    CONFIG_RAM_START={{hex(periph_addr(soc.ram))}}
    CONFIG_RAM_SIZE={{hex(soc.ram.size)}}
    CONFIG_UART_START={{hex(periph_addr(soc.uart))}}
    CONFIG_UART_IRQNO={{irq_index(soc.uart)}}
    CONFIG_UART_RX_RINGBUF_SIZE_LOG2=7
    CONFIG_UART_TX_RINGBUF_SIZE_LOG2=7
    CONFIG_TIMER_START={{hex(periph_addr(soc.timer))}}
    CONFIG_TIMER_IRQNO={{irq_index(soc.timer)}}
    CONFIG_TIMER_CTR_WIDTH={{soc.timer.width}}
    CONFIG_CLOCK_FREQ={{soc.clk_freq}}

    {% if soc.sdram is not none %}
    CONFIG_WITH_SDRAM=y
    CONFIG_SDRAM_START={{hex(periph_addr(soc.sdram))}}
    CONFIG_SDRAM_SIZE={{hex(soc.sdram.core.size)}}
    {% else %}
    CONFIG_WITH_SDRAM=n
    {% endif %}
"#;

pub const HEADER_TEMPLATE: &str = r#"
    // {{autogenerated}}
    #ifndef __LITEX_CONFIG_H_SOCGEN
    #define __LITEX_CONFIG_H_SOCGEN

    #define LX_CONFIG_TIMER_START {{hex(periph_addr(soc.timer))}}

    {% if soc.sdram is not none %}
    #define LX_CONFIG_SDRAM_START {{hex(periph_addr(soc.sdram))}}UL
    #define LX_CONFIG_SDRAM_SIZE {{hex(soc.sdram.core.size)}}UL
    #define LX_CONFIG_SDRAM_CACHE_SIZE {{soc.sdram.cache.size}}
    #define LX_CONFIG_MEMTEST_DATA_SIZE 2*1024*1024
    #define LX_CONFIG_MEMTEST_ADDR_SIZE 65536
    {% endif %}

    #endif
"#;

pub const MAKE_TEMPLATE: &str = r#"
    {% if soc.sdram is not none %}
    litedram_dir={{litedram_dir}}/{{soc.sdram.core.name}}
    {% endif %}
    build={{build_dir}}
    KCONFIG_CONFIG={{build_dir}}/{{name}}.config
    make -C {{software_dir}}/bios 1>&2
"#;

/// The BIOS file and command templates.
pub fn bios_templates() -> TemplateRegistry {
    let mut registry = TemplateRegistry::new();
    registry
        .add_file(CONFIG_PATH, CONFIG_TEMPLATE)
        .add_file(HEADER_PATH, HEADER_TEMPLATE);
    registry.add_command("bios", MAKE_TEMPLATE);
    registry
}

/// A plan builder for the BIOS.
pub fn bios_builder() -> PlanBuilder {
    PlanBuilder::new(bios_templates())
}
