mod common;
use chrono::NaiveDate;
use common::{max_abs_diff, synthetic_recording};
use ndarray::Array2;
use eegstd::edf::{read_edf, record_layout, write_edf};
use eegstd::{EegSignal, Error, Montage, StandardizeConfig, Strictness, BIPOLAR_DBANANA, ELECTRODES_10_20};
use std::path::Path;

fn field(buf: &mut Vec<u8>, value: &str, width: usize) {
    let mut bytes = value.as_bytes().to_vec();
    bytes.resize(width, b' ');
    buf.extend_from_slice(&bytes);
}

/// Hand-built EDF: every signal calibrated to 0.1 physical unit per step.
/// `signals` holds `(label, samples per record, digital samples)`.
fn write_raw_edf(path: &Path, signals: &[(&str, usize, Vec<i16>)], n_records: i64, record_duration: &str) {
    let ns = signals.len();
    let mut buf = Vec::new();
    field(&mut buf, "0", 8);
    field(&mut buf, "X X X X", 80);
    field(&mut buf, "Startdate X X X X", 80);
    field(&mut buf, "02.03.04", 8);
    field(&mut buf, "05.06.07", 8);
    field(&mut buf, &(256 * (ns + 1)).to_string(), 8);
    field(&mut buf, "EDF+C", 44);
    field(&mut buf, &n_records.to_string(), 8);
    field(&mut buf, record_duration, 8);
    field(&mut buf, &ns.to_string(), 4);
    for (label, _, _) in signals {
        field(&mut buf, label, 16);
    }
    for _ in signals {
        field(&mut buf, "", 80);
    }
    for _ in signals {
        field(&mut buf, "uV", 8);
    }
    for _ in signals {
        field(&mut buf, "-3276.8", 8);
    }
    for _ in signals {
        field(&mut buf, "3276.7", 8);
    }
    for _ in signals {
        field(&mut buf, "-32768", 8);
    }
    for _ in signals {
        field(&mut buf, "32767", 8);
    }
    for _ in signals {
        field(&mut buf, "", 80);
    }
    for (_, spr, _) in signals {
        field(&mut buf, &spr.to_string(), 8);
    }
    for _ in signals {
        field(&mut buf, "", 32);
    }
    let records = signals[0].2.len() / signals[0].1;
    for r in 0..records {
        for (_, spr, samples) in signals {
            for v in &samples[r * spr..(r + 1) * spr] {
                buf.extend_from_slice(&v.to_le_bytes());
            }
        }
    }
    std::fs::write(path, buf).unwrap();
}

#[test]
fn read_hand_built_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.edf");
    let fp1: Vec<i16> = (0..8).collect();
    let cz: Vec<i16> = (0..8).map(|v| -v * 10).collect();
    let annot: Vec<i16> = vec![0; 4];
    write_raw_edf(
        &path,
        &[("EEG FP1-REF", 4, fp1), ("EDF Annotations", 2, annot), ("EEG CZ-REF", 4, cz)],
        2,
        "1",
    );

    let rec = read_edf(&path).unwrap();
    assert_eq!(rec.labels(), ["EEG FP1-REF", "EEG CZ-REF"]);
    assert_eq!(
        rec.start,
        NaiveDate::from_ymd_opt(2004, 3, 2).unwrap().and_hms_opt(5, 6, 7).unwrap()
    );
    assert_eq!(rec.signals[0].fs, 4.0);
    approx::assert_abs_diff_eq!(rec.signals[0].samples[3], 0.3, epsilon = 1e-9);
    approx::assert_abs_diff_eq!(rec.signals[1].samples[7], -7.0, epsilon = 1e-9);
    assert_eq!(rec.duration_secs(), 2.0);
}

#[test]
fn unknown_record_count_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("live.edf");
    write_raw_edf(&path, &[("Cz", 2, vec![1, 2, 3, 4, 5, 6])], -1, "1");
    assert!(matches!(read_edf(&path), Err(Error::Edf(_))));
}

#[test]
fn oversized_header_counts_are_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.edf");
    // 512 bytes of header claiming ~10^16 samples and no data at all.
    write_raw_edf(&path, &[("Cz", 99_999_999, Vec::new())], 99_999_999, "1");
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 512);
    assert!(matches!(read_edf(&path), Err(Error::Edf(_))));
}

#[test]
fn truncated_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.edf");
    write_raw_edf(&path, &[("Cz", 2, vec![1, 2, 3, 4])], 5, "1");
    assert!(matches!(read_edf(&path), Err(Error::Edf(_))));

    std::fs::write(&path, b"0       garbage").unwrap();
    assert!(matches!(read_edf(&path), Err(Error::Edf(_))));
}

#[test]
fn mixed_rates_resampled_to_highest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.edf");
    // Fp1 at 8 Hz, F7 at 4 Hz, both constant.
    write_raw_edf(
        &path,
        &[("Fp1", 8, vec![100; 32]), ("F7", 4, vec![-50; 16])],
        4,
        "1",
    );
    let eeg = EegSignal::load_edf(&path, Montage::Unipolar, &["Fp1", "F7"], Strictness::Strict).unwrap();
    assert_eq!(eeg.fs(), 8.0);
    assert_eq!(eeg.n_samples(), 32);
    for &v in eeg.data().row(1) {
        approx::assert_abs_diff_eq!(v, -5.0, epsilon = 1e-9);
    }
}

#[test]
fn standardized_signal_round_trips_through_edf() {
    let raw = synthetic_recording(&ELECTRODES_10_20, 250.0, 4.0);
    let mut eeg = EegSignal::load(&raw, Montage::Unipolar, &ELECTRODES_10_20, Strictness::Strict)
        .unwrap()
        .with_start_time(NaiveDate::from_ymd_opt(2019, 7, 1).unwrap().and_hms_opt(13, 0, 0));
    eeg.standardize_with(&StandardizeConfig::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("std.edf");
    eeg.save_edf(&path).unwrap();

    let back = EegSignal::load_edf(&path, Montage::Unipolar, &ELECTRODES_10_20, Strictness::Strict).unwrap();
    assert_eq!(back.fs(), 256.0);
    assert_eq!(back.channels(), eeg.channels());
    assert_eq!(back.start_time(), eeg.start_time());
    assert_eq!(back.n_samples(), eeg.n_samples());
    // 16-bit quantisation of a ~±60 µV range.
    assert!(max_abs_diff(back.data(), eeg.data()) < 1e-2);
}

#[test]
fn bipolar_signal_round_trips_through_edf() {
    let raw = synthetic_recording(&ELECTRODES_10_20, 256.0, 2.0);
    let mut eeg = EegSignal::load(&raw, Montage::Unipolar, &ELECTRODES_10_20, Strictness::Strict).unwrap();
    eeg.re_reference_to_bipolar(Strictness::Strict).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bp.edf");
    eeg.save_edf(&path).unwrap();
    let back = EegSignal::load_edf(&path, Montage::Bipolar, &BIPOLAR_DBANANA, Strictness::Strict).unwrap();
    assert_eq!(back.channels(), BIPOLAR_DBANANA);
    assert_eq!(back.montage(), Montage::Bipolar);
    assert!(max_abs_diff(back.data(), eeg.data()) < 1e-2);
}

#[test]
fn partial_second_signal_round_trips_through_edf() {
    let raw = synthetic_recording(&["Fp1", "Cz"], 256.0, 300.0 / 256.0);
    let eeg = EegSignal::load(&raw, Montage::Unipolar, &["Fp1", "Cz"], Strictness::Strict).unwrap();
    assert_eq!(eeg.n_samples(), 300);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.edf");
    eeg.save_edf(&path).unwrap();
    let back = EegSignal::load_edf(&path, Montage::Unipolar, &["Fp1", "Cz"], Strictness::Strict).unwrap();
    assert_eq!(back.fs(), 256.0);
    assert_eq!(back.n_samples(), 300);
    assert_eq!(back.duration_secs(), eeg.duration_secs());
    assert!(max_abs_diff(back.data(), eeg.data()) < 1e-2);
}

#[test]
fn odd_lengths_survive_padding() {
    assert_eq!(record_layout(256.0).unwrap(), (1.0, 256));
    assert_eq!(record_layout(0.25).unwrap(), (4.0, 1));

    let dir = tempfile::tempdir().unwrap();
    for n in [1usize, 255, 257, 1001] {
        let data = Array2::from_shape_fn((2, n), |(c, t)| (c as f64 + 1.0) * (t % 17) as f64);
        let labels = vec!["Fp1".to_string(), "Fp2".to_string()];
        let path = dir.path().join(format!("n{n}.edf"));
        write_edf(&path, &data, &labels, 256.0, None).unwrap();

        let rec = read_edf(&path).unwrap();
        assert_eq!(rec.n_records, n.div_ceil(256), "{n} samples");
        for sig in &rec.signals {
            assert_eq!(sig.samples.len(), n, "{n} samples");
        }
        assert_eq!(rec.duration_secs(), n as f64 / 256.0);
    }
}
