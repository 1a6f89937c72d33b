//! End-to-end tests for the quantization parameter library.
//! These tests drive the public API the way a model quantizer would.

use half::f16;
use qlinear_quant::*;

fn representable_std_dev() -> f64 {
    let values: Vec<f64> = Float8E4M3Fn::finite_values().map(f64::from).collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Test 1: The zero point always lies inside the representable range
#[test]
fn test_zero_point_within_range() {
    let bounds = [-1000.0f32, -3.5, -1.0, -0.01, 0.0];
    let uppers = [0.0f32, 0.01, 1.0, 7.25, 1000.0];

    let storages = [
        StorageType::QInt8,
        StorageType::QUInt8,
        StorageType::QInt16,
        StorageType::QUInt16,
    ];
    for storage in storages {
        for reduce_range in [false, true] {
            for symmetric in [false, true] {
                let range = resolve_range(storage, reduce_range, symmetric).unwrap();
                for &rmin in &bounds {
                    for &rmax in &uppers {
                        let (zp, _) = compute_scale_zero_point(
                            rmin,
                            rmax,
                            range.qmin(),
                            range.qmax(),
                            symmetric,
                            None,
                        )
                        .unwrap();
                        assert!(
                            range.contains(i64::from(zp)),
                            "{storage} [{rmin}, {rmax}] gave zero point {zp}"
                        );
                    }
                }
            }
        }
    }
}

/// Test 2: Symmetric zero points are fixed per type
#[test]
fn test_symmetric_zero_points() {
    let expected = [
        (StorageType::QInt8, 0),
        (StorageType::QUInt8, 128),
        (StorageType::QInt16, 0),
        (StorageType::QUInt16, 32768),
    ];
    for (storage, zp) in expected {
        for data in [[-1.0f32, 0.5], [-0.25, 8.0], [-300.0, 2.0]] {
            let weight = quantize_data(&data, storage, true, false, None, None, None).unwrap();
            assert_eq!(weight.zero_point.as_i32(), Some(zp), "{storage} {data:?}");
        }
    }
}

/// Test 3: Dequantized values stay within one step of the input
#[test]
fn test_roundtrip_bound() {
    let data: Vec<f32> = (0..257).map(|i| (i as f32 * 0.37).sin() * 4.0 + 1.0).collect();
    for (storage, symmetric) in [
        (StorageType::QUInt8, false),
        (StorageType::QInt8, true),
        (StorageType::QUInt16, false),
        (StorageType::QInt16, true),
    ] {
        let weight = quantize_data(&data, storage, symmetric, false, None, None, None).unwrap();
        let restored = dequantize(&weight.quantized, weight.scale, weight.zero_point).unwrap();
        for (x, y) in data.iter().zip(&restored) {
            assert!((x - y).abs() <= weight.scale, "{storage}: {x} -> {y}");
        }
    }
}

/// Test 4: A collapsed range falls back to scale 1 and zero point 0
#[test]
fn test_degenerate_range() {
    let (zp, scale) = compute_scale_zero_point(0.0f32, 0.0, -128, 127, false, None).unwrap();
    assert_eq!((zp, scale), (0, 1.0));

    let weight = quantize_data(&[0.0f32; 4], StorageType::QInt8, false, false, None, None, None)
        .unwrap();
    assert_eq!(weight.scale, 1.0);
    assert_eq!(weight.zero_point, ZeroPoint::I8(0));
    assert_eq!(weight.quantized.codes(), vec![0; 4]);
}

/// Test 5: Empty input is legal
#[test]
fn test_empty_input() {
    let weight = quantize_data::<f32>(&[], StorageType::QUInt8, false, false, None, None, None)
        .unwrap();
    assert_eq!((weight.rmin, weight.rmax, weight.scale), (0.0, 0.0, 1.0));
    assert_eq!(weight.zero_point, ZeroPoint::U8(0));
    assert!(weight.quantized.is_empty());
}

/// Test 6: Reduced-range uint8 never leaves [0, 127]
#[test]
fn test_reduced_range_uint8() {
    // Data symmetric around zero puts both the zero point and the top code on a tie.
    for symmetric in [false, true] {
        for data in [[-1.0f32, 1.0], [-0.5, 0.5], [-3.0, 3.0]] {
            let weight =
                quantize_data(&data, StorageType::QUInt8, symmetric, true, None, None, None)
                    .unwrap();
            assert_eq!(weight.quantized.codes(), vec![0, 127], "{data:?}");
        }
    }

    let data: Vec<f32> = (-50..50).map(|i| i as f32 * 0.3).collect();
    let weight = quantize_data(&data, StorageType::QUInt8, false, true, None, None, None).unwrap();
    let range = resolve_range(StorageType::QUInt8, true, false).unwrap();

    let quantized = quantize(
        StorageType::QUInt8,
        &data,
        weight.scale,
        weight.zero_point,
        Some(range.qmin()),
        Some(range.qmax()),
    )
    .unwrap();
    assert!(quantized.codes().iter().all(|&q| (0..=127).contains(&q)));
    assert!(weight.quantized.codes().iter().all(|&q| (0..=127).contains(&q)));
}

/// Test 7: Float8 scale follows the spread of the data
#[test]
fn test_float8_scale() {
    let data = [-2.0f32, -1.0, 1.0, 2.0];
    let weight =
        quantize_data(&data, StorageType::QFloat8E4M3Fn, false, false, None, None, None).unwrap();

    let std = (2.5f64).sqrt();
    let expected = (std / representable_std_dev()) as f32;
    assert!((weight.scale - expected).abs() < 1e-6);
    assert!(weight.zero_point.is_zero());
    assert_eq!(weight.quantized.len(), 4);

    let zeros =
        quantize_data(&[0.0f32; 8], StorageType::QFloat8E4M3Fn, false, false, None, None, None)
            .unwrap();
    assert!(zeros.quantized.codes().iter().all(|&c| c == 0));
}

/// Test 8: The documented end-to-end example
#[test]
fn test_example_int8_symmetric() {
    let weight =
        quantize_data(&[-1.0f32, 0.0, 2.0], StorageType::QInt8, true, false, None, None, None)
            .unwrap();
    let range = resolve_range(StorageType::QInt8, false, true).unwrap();

    assert_eq!((range.qmin(), range.qmax()), (-127, 127));
    assert_eq!(weight.zero_point, ZeroPoint::I8(0));
    assert!((weight.scale - 2.0 / 127.0).abs() < 1e-7);
    assert_eq!(weight.quantized, QuantizedData::I8(vec![-64, 0, 127]));
}

/// Test 9: Half-precision input keeps half-precision parameters
#[test]
fn test_f16_input() {
    let data: Vec<f16> = [-1.0f32, 0.0, 3.0].iter().map(|&x| f16::from_f32(x)).collect();
    let weight = quantize_data(&data, StorageType::QUInt8, false, false, None, None, None).unwrap();

    assert_eq!(weight.rmin, f16::from_f32(-1.0));
    assert_eq!(weight.scale, f16::from_f64(4.0 / 255.0));
    assert_eq!(weight.zero_point, ZeroPoint::U8(64));
}

/// Test 10: Calibrated ranges feed the batch driver
#[test]
fn test_calibration_feeds_quantization() {
    let mut data: Vec<f32> = (0..1000).map(|i| (i as f32 - 500.0) / 100.0).collect();
    data.push(1000.0);

    let calib = calibrate(&data, CalibrationMethod::Percentile(990)).unwrap();
    let config = calib.apply(QuantConfig::new(StorageType::QInt8).with_symmetric(true));
    let weight = quantize_data_with_config(&data, &config).unwrap();

    let plain = quantize_data(&data, StorageType::QInt8, true, false, None, None, None).unwrap();
    assert!(weight.scale < plain.scale);
    assert_eq!(weight.quantized.codes().last(), Some(&127));
}

/// Test 11: Per-channel quantization of a 2-D weight
#[test]
fn test_per_channel_weight() {
    let data = [0.5f32, -0.5, 0.25, 4.0, -8.0, 2.0];
    let config = QuantConfig::new(StorageType::QInt8).with_symmetric(true);
    let initializer = quantize_data_per_axis(&data, &[2, 3], 0, &config).unwrap();

    assert_eq!(initializer.num_channels(), 2);
    assert!(initializer.scales[0] < initializer.scales[1]);
    let codes = initializer.quantized.codes();
    assert_eq!(codes[0], 127);
    assert_eq!(codes[4], -127);
}

/// Test 12: Half-precision data with a small spread keeps its float8 scale
#[test]
fn test_float8_f16_small_spread() {
    let data: Vec<f16> =
        [-0.004f32, 0.004, -0.002, 0.002].iter().map(|&x| f16::from_f32(x)).collect();
    let weight =
        quantize_data(&data, StorageType::QFloat8E4M3Fn, false, false, None, None, None).unwrap();

    let values: Vec<f64> = data.iter().map(|x| x.to_f64()).collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let (_, expected) =
        compute_scale_zero_point_float8(Float8Variant::E4M3Fn, f16::from_f64(variance.sqrt()))
            .unwrap();
    assert_eq!(weight.scale, expected);
    assert_ne!(weight.scale, f16::ONE);

    let restored = dequantize(&weight.quantized, weight.scale, weight.zero_point).unwrap();
    for (x, y) in data.iter().zip(&restored) {
        let x = x.to_f32();
        assert!((x - y).abs() <= 0.07 * x.abs(), "{x} -> {y}");
    }
}
