#![no_main]

use aplanar::config::ConverterConfig;
use aplanar::csv_output::CsvOutput;
use aplanar::input::parse_records;
use aplanar::pipeline::Converter;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Decoding and conversion must never panic, whatever the input shape
        let mut batch = parse_records(input);
        let Ok(converter) = Converter::new(ConverterConfig::default()) else {
            return;
        };
        batch.retain_complete(&converter.config().required_fields());
        if let Ok(conversion) = converter.convert(&batch.records) {
            let _ = CsvOutput::default().to_csv(&conversion.table);
        }
    }
});
