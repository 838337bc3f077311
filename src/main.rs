//! WAV to AEA converter command line tool
//!
//! This tool encodes 44.1 kHz WAV files into ATRAC1 AEA files, decodes them
//! back, and dumps per-unit metadata as JSON for inspection.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::process;

use log::{debug, error, info};
use serde::Serialize;

use atrac1_rs::aea::{read_aea, write_aea};
use atrac1_rs::pcm_utils::{deinterleave, f32_to_i16, i16_to_f32, interleave};
use atrac1_rs::streaming::{StreamDecoder, StreamEncoder};
use atrac1_rs::wav::{read_wav_file, write_wav_file};
use atrac1_rs::{deserialize_frame, CodecError, EncoderOptions, NUM_SAMPLES, SOUND_UNIT_SIZE};

const USAGE: &str = "Usage: atrac1 <command> [options]\n\
     \n\
     Commands:\n\
       encode --input <wav> --output <aea> [--title <s>]\n\
              [--transient-threshold-low <f>] [--transient-threshold-mid <f>]\n\
              [--transient-threshold-high <f>]\n\
       decode --input <aea> --output <wav>\n\
       dump   --input <aea> --output <json>\n\
     \n\
     Examples:\n\
       atrac1 encode --input song.wav --output song.aea --title \"My Song\"\n\
       atrac1 decode --input song.aea --output song.wav\n\
       atrac1 dump --input song.aea --output song.json";

/// Parsed command line arguments
struct Args {
    command: Command,
    input: String,
    output: String,
    title: String,
    options: EncoderOptions,
}

#[derive(Clone, Copy, PartialEq)]
enum Command {
    Encode,
    Decode,
    Dump,
}

impl Args {
    /// Parse command line arguments
    fn parse() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        if args.len() < 2 {
            return Err(USAGE.to_string());
        }

        let command = match args[1].as_str() {
            "encode" => Command::Encode,
            "decode" => Command::Decode,
            "dump" => Command::Dump,
            other => return Err(format!("Unknown command: {}\n\n{}", other, USAGE)),
        };

        let mut input = None;
        let mut output = None;
        let mut title = String::new();
        let mut options = EncoderOptions::default();

        let mut i = 2;
        while i < args.len() {
            let flag = args[i].as_str();
            let value = args
                .get(i + 1)
                .ok_or_else(|| format!("Missing value for {}", flag))?;
            match flag {
                "--input" => input = Some(value.clone()),
                "--output" => output = Some(value.clone()),
                "--title" => title = value.clone(),
                "--transient-threshold-low" => {
                    options.transient_threshold_low = value
                        .parse()
                        .map_err(|_| format!("Invalid threshold: {}", value))?;
                }
                "--transient-threshold-mid" => {
                    options.transient_threshold_mid = value
                        .parse()
                        .map_err(|_| format!("Invalid threshold: {}", value))?;
                }
                "--transient-threshold-high" => {
                    options.transient_threshold_high = value
                        .parse()
                        .map_err(|_| format!("Invalid threshold: {}", value))?;
                }
                other => return Err(format!("Unknown option: {}\n\n{}", other, USAGE)),
            }
            i += 2;
        }

        Ok(Args {
            command,
            input: input.ok_or_else(|| format!("--input is required\n\n{}", USAGE))?,
            output: output.ok_or_else(|| format!("--output is required\n\n{}", USAGE))?,
            title,
            options,
        })
    }
}

/// Encode a WAV file into an AEA file
fn encode(args: &Args) -> Result<(), CodecError> {
    info!("Reading WAV file: {}", args.input);
    let audio = read_wav_file(&args.input)?;
    info!(
        "WAV info: {} Hz, {} channels, {} samples",
        audio.sample_rate,
        audio.channels,
        audio.samples.len()
    );

    if audio.sample_rate != 44100 {
        error!("Unsupported sample rate: {} Hz (need 44100)", audio.sample_rate);
        process::exit(2);
    }
    if audio.channels != 1 && audio.channels != 2 {
        error!("Unsupported channel count: {}", audio.channels);
        process::exit(2);
    }

    let channels = audio.channels as usize;
    let pcm = i16_to_f32(&audio.samples);
    let channel_samples = deinterleave(&pcm, channels);

    // Encode each channel independently, then interleave unit-by-unit.
    let mut per_channel_units: Vec<Vec<[u8; SOUND_UNIT_SIZE]>> = Vec::with_capacity(channels);
    for (ch, samples) in channel_samples.iter().enumerate() {
        let mut encoder = StreamEncoder::with_options(args.options)?;
        let mut units = encoder.push_samples(samples)?;
        units.extend(encoder.finish()?);
        debug!("channel {}: {} units", ch, units.len());
        per_channel_units.push(units);
    }

    let units_per_channel = per_channel_units[0].len();
    let mut units = Vec::with_capacity(units_per_channel * channels);
    for i in 0..units_per_channel {
        for channel_units in &per_channel_units {
            units.push(channel_units[i]);
        }
    }

    info!("Writing AEA file: {}", args.output);
    let mut file = BufWriter::new(File::create(&args.output)?);
    write_aea(&mut file, &args.title, channels as u8, &units)?;

    let input_size = audio.samples.len() * 2;
    let output_size = units.len() * SOUND_UNIT_SIZE + 2048;
    let duration = audio.samples.len() as f64 / (44100.0 * channels as f64);
    println!("Encoding completed successfully");
    println!("   Input size:  {} bytes", input_size);
    println!("   Output size: {} bytes", output_size);
    println!("   Compression: {:.1}:1", input_size as f64 / output_size as f64);
    println!("   Duration:    {:.2} seconds", duration);
    Ok(())
}

/// Decode an AEA file into a WAV file
fn decode(args: &Args) -> Result<(), CodecError> {
    info!("Reading AEA file: {}", args.input);
    let mut file = File::open(&args.input)?;
    let (header, units) = read_aea(&mut file)?;
    info!(
        "AEA info: title \"{}\", {} units, {} channels",
        header.title,
        units.len(),
        header.channel_count
    );

    let channels = header.channel_count as usize;
    let units_per_channel = units.len() / channels;

    let mut channel_samples: Vec<Vec<f32>> = Vec::with_capacity(channels);
    for ch in 0..channels {
        let mut decoder = StreamDecoder::new();
        let mut samples = Vec::with_capacity(units_per_channel * NUM_SAMPLES);
        for i in 0..units_per_channel {
            samples.extend(decoder.push_unit(&units[i * channels + ch])?);
        }
        samples.extend(decoder.finish());
        debug!("channel {}: {} samples", ch, samples.len());
        channel_samples.push(samples);
    }

    let interleaved = f32_to_i16(&interleave(&channel_samples));
    info!("Writing WAV file: {}", args.output);
    write_wav_file(&args.output, &interleaved, 44100, channels as u16)?;

    let duration = interleaved.len() as f64 / (44100.0 * channels as f64);
    println!("Decoding completed successfully");
    println!("   Output samples: {}", interleaved.len());
    println!("   Duration:       {:.2} seconds", duration);
    Ok(())
}

#[derive(Serialize)]
struct DumpUnit {
    index: usize,
    channel: usize,
    block_mode: [u8; 3],
    n_bfu: usize,
    data_bits: usize,
    word_length_indices: Vec<u8>,
    scale_factor_indices: Vec<u8>,
}

#[derive(Serialize)]
struct DumpFile {
    title: String,
    frame_count: u32,
    channel_count: u8,
    units: Vec<DumpUnit>,
}

/// Dump per-unit metadata of an AEA file as JSON
fn dump(args: &Args) -> Result<(), CodecError> {
    info!("Reading AEA file: {}", args.input);
    let mut file = File::open(&args.input)?;
    let (header, units) = read_aea(&mut file)?;

    let channels = header.channel_count as usize;
    let mut dump_units = Vec::with_capacity(units.len());
    for (i, unit) in units.iter().enumerate() {
        let frame = deserialize_frame(unit)?;
        dump_units.push(DumpUnit {
            index: i / channels,
            channel: i % channels,
            block_mode: frame.block_size_mode.log_count,
            n_bfu: frame.n_bfu,
            data_bits: frame.data_bits(),
            word_length_indices: frame.word_length_indices,
            scale_factor_indices: frame.scale_factor_indices,
        });
    }

    let dump_file = DumpFile {
        title: header.title,
        frame_count: header.frame_count,
        channel_count: header.channel_count,
        units: dump_units,
    };

    info!("Writing JSON file: {}", args.output);
    let out = BufWriter::new(File::create(&args.output)?);
    serde_json::to_writer_pretty(out, &dump_file).map_err(std::io::Error::from)?;
    println!("Dumped {} units", dump_file.units.len());
    Ok(())
}

/// Map error kinds to the tool's exit codes
fn exit_code(err: &CodecError) -> i32 {
    match err {
        CodecError::Frame(_) | CodecError::Container(_) | CodecError::Options(_) => 2,
        _ => 1,
    }
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    let args = match Args::parse() {
        Ok(args) => args,
        Err(err) => {
            error!("{}", err);
            process::exit(1);
        }
    };

    if !Path::new(&args.input).exists() {
        error!("Input file '{}' does not exist", args.input);
        process::exit(1);
    }

    let result = match args.command {
        Command::Encode => encode(&args),
        Command::Decode => decode(&args),
        Command::Dump => dump(&args),
    };

    if let Err(err) = result {
        error!("{}", err);
        process::exit(exit_code(&err));
    }
}
