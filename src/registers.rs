//! Register definitions for the BMI270
//!
//! The BMI270 has a flat 7-bit register map (no bank switching). Registers that
//! are only ever accessed as multi-byte bursts (sensor data, FIFO data, the
//! config-file window) are listed as plain addresses in [`addr`] instead of
//! being modelled as bitfields.
//!
//! Over SPI the address byte carries the read flag in bit 7, and every read
//! returns one dummy byte before the payload. Both are handled by
//! [`SpiInterface`](crate::interface::SpiInterface).

device_driver::create_device!(
    device_name: Bmi270,
    dsl: {
        config {
            type RegisterAddressType = u8;
            type DefaultByteOrder = LE;
        }

        /// CHIP_ID - Chip identification (0x00)
        /// Expected value: 0x24
        register ChipId {
            const ADDRESS = 0x00;
            const SIZE_BITS = 8;

            /// Chip identification code
            chip_id: uint = 0..8,
        },

        /// ERR_REG - Sensor error flags (0x02)
        register ErrReg {
            const ADDRESS = 0x02;
            const SIZE_BITS = 8;

            /// Fatal error, chip is not operable
            fatal_err: bool = 0,
            /// Internal error code
            internal_err: uint = 1..5,
            reserved_5: uint = 5..6,
            /// FIFO error
            fifo_err: bool = 6,
            /// Auxiliary interface error
            aux_err: bool = 7,
        },

        /// STATUS - Sensor status flags (0x03)
        register Status {
            const ADDRESS = 0x03;
            const SIZE_BITS = 8;

            reserved_1_0: uint = 0..2,
            /// Auxiliary interface busy
            aux_busy: bool = 2,
            reserved_3: uint = 3..4,
            /// Command decoder ready
            cmd_rdy: bool = 4,
            /// Auxiliary data ready
            drdy_aux: bool = 5,
            /// Gyroscope data ready
            drdy_gyr: bool = 6,
            /// Accelerometer data ready
            drdy_acc: bool = 7,
        },

        /// INT_STATUS_1 - Data interrupt status, cleared on read (0x1D)
        register IntStatus1 {
            const ADDRESS = 0x1D;
            const SIZE_BITS = 8;

            /// FIFO full interrupt
            ffull_int: bool = 0,
            /// FIFO watermark interrupt
            fwm_int: bool = 1,
            /// Error interrupt
            err_int: bool = 2,
            reserved_4_3: uint = 3..5,
            /// Auxiliary data ready interrupt
            aux_drdy_int: bool = 5,
            /// Gyroscope data ready interrupt
            gyr_drdy_int: bool = 6,
            /// Accelerometer data ready interrupt
            acc_drdy_int: bool = 7,
        },

        /// INTERNAL_STATUS - Initialization result (0x21)
        register InternalStatus {
            const ADDRESS = 0x21;
            const SIZE_BITS = 8;

            /// Initialization message (0 = not initialized, 1 = init ok, 2 = init error)
            message: uint = 0..4,
            reserved_4: uint = 4..5,
            /// Axis remap error
            axes_remap_error: bool = 5,
            /// ODR below 50 Hz for a feature that requires it
            odr_50_hz_error: bool = 6,
            reserved_7: uint = 7..8,
        },

        /// ACC_CONF - Accelerometer configuration (0x40)
        register AccConf {
            const ADDRESS = 0x40;
            const SIZE_BITS = 8;

            /// Output data rate
            acc_odr: uint = 0..4,
            /// Bandwidth / averaging
            acc_bwp: uint = 4..7,
            /// Filter performance mode (0 = power optimized, 1 = performance optimized)
            acc_filter_perf: bool = 7,
        },

        /// ACC_RANGE - Accelerometer range (0x41)
        register AccRange {
            const ADDRESS = 0x41;
            const SIZE_BITS = 8;

            /// Range selection (0 = 2g, 1 = 4g, 2 = 8g, 3 = 16g)
            acc_range: uint = 0..2,
            reserved_7_2: uint = 2..8,
        },

        /// GYR_CONF - Gyroscope configuration (0x42)
        register GyrConf {
            const ADDRESS = 0x42;
            const SIZE_BITS = 8;

            /// Output data rate
            gyr_odr: uint = 0..4,
            /// Bandwidth
            gyr_bwp: uint = 4..6,
            /// Noise performance mode
            gyr_noise_perf: bool = 6,
            /// Filter performance mode (0 = power optimized, 1 = performance optimized)
            gyr_filter_perf: bool = 7,
        },

        /// GYR_RANGE - Gyroscope range (0x43)
        register GyrRange {
            const ADDRESS = 0x43;
            const SIZE_BITS = 8;

            /// Range selection (0 = 2000dps, 1 = 1000dps, 2 = 500dps, 3 = 250dps, 4 = 125dps)
            gyr_range: uint = 0..3,
            /// OIS range (0 = 250dps, 1 = 2000dps)
            ois_range: bool = 3,
            reserved_7_4: uint = 4..8,
        },

        /// FIFO_WTM_0 - FIFO watermark bits 7:0 (0x46)
        register FifoWtm0 {
            const ADDRESS = 0x46;
            const SIZE_BITS = 8;

            /// Watermark level, low byte (in bytes)
            fifo_water_mark_7_0: uint = 0..8,
        },

        /// FIFO_WTM_1 - FIFO watermark bits 12:8 (0x47)
        register FifoWtm1 {
            const ADDRESS = 0x47;
            const SIZE_BITS = 8;

            /// Watermark level, high bits
            fifo_water_mark_12_8: uint = 0..5,
            reserved_7_5: uint = 5..8,
        },

        /// FIFO_CONFIG_0 - FIFO mode (0x48)
        register FifoConfig0 {
            const ADDRESS = 0x48;
            const SIZE_BITS = 8;

            /// Stop writing when full instead of overwriting the oldest frames
            fifo_stop_on_full: bool = 0,
            /// Append a sensor-time frame after the last valid frame
            fifo_time_en: bool = 1,
            reserved_7_2: uint = 2..8,
        },

        /// FIFO_CONFIG_1 - FIFO frame contents (0x49)
        register FifoConfig1 {
            const ADDRESS = 0x49;
            const SIZE_BITS = 8;

            /// INT1 tagging
            fifo_tag_int_1_en: uint = 0..2,
            /// INT2 tagging
            fifo_tag_int_2_en: uint = 2..4,
            /// Header mode
            fifo_header_en: bool = 4,
            /// Store auxiliary data
            fifo_aux_en: bool = 5,
            /// Store accelerometer data
            fifo_acc_en: bool = 6,
            /// Store gyroscope data
            fifo_gyr_en: bool = 7,
        },

        /// INT1_IO_CTRL - INT1 pin electrical behaviour (0x53)
        register Int1IoCtrl {
            const ADDRESS = 0x53;
            const SIZE_BITS = 8;

            reserved_0: uint = 0..1,
            /// Active level (0 = active low, 1 = active high)
            lvl: bool = 1,
            /// Output type (0 = push-pull, 1 = open drain)
            od: bool = 2,
            /// Output enable
            output_en: bool = 3,
            /// Input enable
            input_en: bool = 4,
            reserved_7_5: uint = 5..8,
        },

        /// INT2_IO_CTRL - INT2 pin electrical behaviour (0x54)
        register Int2IoCtrl {
            const ADDRESS = 0x54;
            const SIZE_BITS = 8;

            reserved_0: uint = 0..1,
            /// Active level (0 = active low, 1 = active high)
            lvl: bool = 1,
            /// Output type (0 = push-pull, 1 = open drain)
            od: bool = 2,
            /// Output enable
            output_en: bool = 3,
            /// Input enable
            input_en: bool = 4,
            reserved_7_5: uint = 5..8,
        },

        /// INT_LATCH - Interrupt latch mode (0x55)
        register IntLatch {
            const ADDRESS = 0x55;
            const SIZE_BITS = 8;

            /// Latched (1) or pulsed (0) interrupts
            int_latch: bool = 0,
            reserved_7_1: uint = 1..8,
        },

        /// INT_MAP_DATA - Data interrupt routing (0x58)
        register IntMapData {
            const ADDRESS = 0x58;
            const SIZE_BITS = 8;

            /// FIFO full to INT1
            ffull_int_1: bool = 0,
            /// FIFO watermark to INT1
            fwm_int_1: bool = 1,
            /// Data ready to INT1
            drdy_int_1: bool = 2,
            /// Error to INT1
            err_int_1: bool = 3,
            /// FIFO full to INT2
            ffull_int_2: bool = 4,
            /// FIFO watermark to INT2
            fwm_int_2: bool = 5,
            /// Data ready to INT2
            drdy_int_2: bool = 6,
            /// Error to INT2
            err_int_2: bool = 7,
        },

        /// INIT_CTRL - Config file load control (0x59)
        register InitCtrl {
            const ADDRESS = 0x59;
            const SIZE_BITS = 8;

            /// 0 = prepare config load, 1 = config load complete
            init_ctrl: uint = 0..8,
        },

        /// INIT_ADDR_0 - Config file word address bits 3:0 (0x5B)
        register InitAddr0 {
            const ADDRESS = 0x5B;
            const SIZE_BITS = 8;

            /// Word address, low nibble
            base_0_3: uint = 0..4,
            reserved_7_4: uint = 4..8,
        },

        /// INIT_ADDR_1 - Config file word address bits 11:4 (0x5C)
        register InitAddr1 {
            const ADDRESS = 0x5C;
            const SIZE_BITS = 8;

            /// Word address, high byte
            base_11_4: uint = 0..8,
        },

        /// PWR_CONF - Power mode configuration (0x7C)
        register PwrConf {
            const ADDRESS = 0x7C;
            const SIZE_BITS = 8;

            /// Advanced power save
            adv_power_save: bool = 0,
            /// FIFO read enabled while in advanced power save
            fifo_self_wake_up: bool = 1,
            /// Fast power up
            fup_en: bool = 2,
            reserved_7_3: uint = 3..8,
        },

        /// PWR_CTRL - Sensor enables (0x7D)
        register PwrCtrl {
            const ADDRESS = 0x7D;
            const SIZE_BITS = 8;

            /// Auxiliary sensor enable
            aux_en: bool = 0,
            /// Gyroscope enable
            gyr_en: bool = 1,
            /// Accelerometer enable
            acc_en: bool = 2,
            /// Temperature sensor enable
            temp_en: bool = 3,
            reserved_7_4: uint = 4..8,
        },

        /// CMD - Command register (0x7E)
        register Cmd {
            const ADDRESS = 0x7E;
            const SIZE_BITS = 8;

            /// Command code
            cmd: uint = 0..8,
        },
    }
);

/// Addresses of registers accessed as raw bursts
pub mod addr {
    /// `CHIP_ID`, also used for the SPI activation dummy read
    pub const CHIP_ID: u8 = 0x00;
    /// `ACC_X_LSB`, start of the 6-byte accelerometer block
    pub const ACC_X_LSB: u8 = 0x0C;
    /// `GYR_X_LSB`, start of the 6-byte gyroscope block
    pub const GYR_X_LSB: u8 = 0x12;
    /// `SENSORTIME_0`, start of the 24-bit sensor time
    pub const SENSORTIME_0: u8 = 0x18;
    /// `TEMPERATURE_0`, start of the 16-bit temperature value
    pub const TEMPERATURE_0: u8 = 0x22;
    /// `FIFO_LENGTH_0`, start of the 2-byte fill level
    pub const FIFO_LENGTH_0: u8 = 0x24;
    /// `FIFO_DATA`, the FIFO read window (does not auto-increment)
    pub const FIFO_DATA: u8 = 0x26;
    /// `INIT_DATA`, the config file write window
    pub const INIT_DATA: u8 = 0x5E;
}

/// Values written to the `CMD` register
pub mod cmd {
    /// Soft reset, returns every register to its reset value
    pub const SOFT_RESET: u8 = 0xB6;
    /// Clear all FIFO content
    pub const FIFO_FLUSH: u8 = 0xB0;
}
