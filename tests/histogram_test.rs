use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use rubberband::histogram::chi_squared_sf;
use rubberband::{
    compare_histogram, generate_ensemble, importance_weights, theoretical_pmf, HistogramComparator,
    RubberBandError,
};

#[test]
fn unweighted_counts_over_total() {
    let theo_l = [-2.0, 0.0, 2.0];
    let theo_p = [0.25, 0.5, 0.25];
    let samples = [0.0, 0.0, 2.0, -2.0, 0.0, 2.0, 0.0, -2.0];
    let (emp, reduced) = compare_histogram(&samples, &theo_l, &theo_p, None, samples.len()).unwrap();
    assert_eq!(emp, vec![0.25, 0.5, 0.25]);
    assert_eq!(reduced, 0.0);
}

#[test]
fn weighted_histogram_normalises_by_weight_sum() {
    let cmp = HistogramComparator::new(&[-2.0, 0.0, 2.0], &[0.2, 0.4, 0.4])
        .unwrap()
        .with_min_expected(0.0)
        .unwrap()
        .compare(&[0.0, 2.0], Some(&[3.0, 1.0]), 2)
        .unwrap();
    assert_eq!(cmp.empirical_probs, vec![0.0, 0.75, 0.25]);
    assert_eq!(cmp.observed_counts, vec![0.0, 1.5, 0.5]);
    assert_eq!(cmp.expected_counts, vec![0.4, 0.8, 0.8]);

    let chi2 = 0.4 + 0.7f64.powi(2) / 0.8 + 0.3f64.powi(2) / 0.8;
    assert!((cmp.chi_squared - chi2).abs() < 1e-12);
    assert_eq!(cmp.degrees_of_freedom, 2);
    assert_eq!(cmp.pooled_cells, 3);
    assert!((cmp.reduced_chi_squared - chi2 / 2.0).abs() < 1e-12);
}

#[test]
fn zero_probability_bins_are_excluded() {
    let comparator = HistogramComparator::new(&[-2.0, 0.0, 2.0], &[0.0, 0.5, 0.5])
        .unwrap()
        .with_min_expected(0.0)
        .unwrap();

    let cmp = comparator.compare(&[0.0, 2.0, 2.0, 0.0], None, 4).unwrap();
    assert_eq!(cmp.chi_squared, 0.0);
    assert_eq!(cmp.excluded_bins, 1);
    assert_eq!(cmp.degrees_of_freedom, 1);

    // A sample in the impossible bin still shows up in the histogram, not as NaN.
    let cmp = comparator.compare(&[-2.0, 0.0, 2.0, 2.0], None, 4).unwrap();
    assert!(cmp.chi_squared.is_finite());
    assert!((cmp.chi_squared - 0.5).abs() < 1e-12);
    assert_eq!(cmp.ratio()[0], None);
    assert_eq!(cmp.ratio()[2], Some(1.0));
}

#[test]
fn sparse_tail_bins_are_pooled_before_scoring() {
    let lengths = [-3.0, -1.0, 1.0, 3.0];
    let probs = [0.01, 0.49, 0.49, 0.01];
    let samples: Vec<f64> = [(-3.0, 3), (-1.0, 47), (1.0, 48), (3.0, 2)]
        .iter()
        .flat_map(|&(l, n)| std::iter::repeat(l).take(n))
        .collect();
    let comparator = HistogramComparator::new(&lengths, &probs).unwrap();

    // Expected counts 1, 49, 49, 1: each tail joins its neighbour.
    let pooled = comparator.compare(&samples, None, 100).unwrap();
    assert_eq!(pooled.pooled_cells, 2);
    assert_eq!(pooled.degrees_of_freedom, 1);
    assert!(pooled.chi_squared.abs() < 1e-12, "chi2 = {}", pooled.chi_squared);
    assert_eq!(pooled.observed_counts, vec![3.0, 47.0, 48.0, 2.0]);

    let per_bin = comparator.with_min_expected(0.0).unwrap().compare(&samples, None, 100).unwrap();
    assert_eq!(per_bin.pooled_cells, 4);
    assert!((per_bin.chi_squared - (5.0 + 5.0 / 49.0)).abs() < 1e-9);

    assert!(HistogramComparator::new(&lengths, &probs).unwrap().with_min_expected(-1.0).is_err());
}

#[test]
fn overflowing_weight_sum_is_rejected() {
    let result = compare_histogram(&[1.0, 1.0], &[-1.0, 1.0], &[0.5, 0.5], Some(&[1e308, 1e308]), 2);
    assert!(
        matches!(&result, Err(RubberBandError::DegenerateWeights(s)) if s.is_infinite()),
        "{result:?}"
    );
}

#[test]
fn samples_off_the_support_are_counted_as_dropped() {
    let cmp = HistogramComparator::new(&[-1.0, 1.0], &[0.5, 0.5])
        .unwrap()
        .compare(&[-1.0, 1.0, 7.0], None, 3)
        .unwrap();
    assert_eq!(cmp.out_of_range, 1);
}

#[test]
fn invalid_inputs() {
    let l = [-1.0, 1.0];
    let p = [0.5, 0.5];
    assert!(matches!(
        compare_histogram(&[1.0, -1.0], &l, &p, Some(&[1.0]), 2),
        Err(RubberBandError::LengthMismatch { field: "weights", .. })
    ));
    assert!(matches!(
        compare_histogram(&[1.0], &l, &[0.5], None, 1),
        Err(RubberBandError::LengthMismatch { .. })
    ));
    assert!(compare_histogram(&[1.0], &l, &p, None, 0).is_err());
    assert!(matches!(
        compare_histogram(&[1.0], &l, &[0.0, 0.0], None, 1),
        Err(RubberBandError::DegenerateTheory)
    ));
    assert!(matches!(
        compare_histogram(&[1.0], &l, &p, Some(&[0.0]), 1),
        Err(RubberBandError::DegenerateWeights(_))
    ));
}

#[test]
fn unbiased_hundred_bond_chain_fits_the_binomial() {
    let (theo_l, theo_p) = theoretical_pmf(100, 1.0, 0.0, 1.0).unwrap();
    for seed in 0..5 {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let ens = generate_ensemble(10_000, 100, 1.0, 0.0, false, 1.0, &mut rng).unwrap();
        let cmp = HistogramComparator::new(&theo_l, &theo_p)
            .unwrap()
            .compare(&ens.lengths(), None, ens.len())
            .unwrap();
        // Tails beyond ~3σ are pooled, leaving roughly 33 cells.
        assert!((25..=40).contains(&cmp.pooled_cells), "seed {seed}: {} cells", cmp.pooled_cells);
        assert!(
            (0.5..1.5).contains(&cmp.reduced_chi_squared),
            "seed {seed}: reduced chi-squared {}",
            cmp.reduced_chi_squared
        );
    }
}

#[test]
fn biased_ensemble_fits_forced_theory() {
    let mut rng = ChaCha20Rng::seed_from_u64(31);
    let ens = generate_ensemble(20_000, 10, 1.0, 0.2, true, 1.0, &mut rng).unwrap();
    let (theo_l, theo_p) = theoretical_pmf(10, 1.0, 0.2, 1.0).unwrap();
    let cmp = HistogramComparator::new(&theo_l, &theo_p)
        .unwrap()
        .compare(&ens.lengths(), None, ens.len())
        .unwrap();
    assert!(cmp.reduced_chi_squared < 3.0, "reduced = {}", cmp.reduced_chi_squared);
    assert!(cmp.p_value() > 1e-4);
}

#[test]
fn reweighted_ensemble_fits_forced_theory() {
    let mut rng = ChaCha20Rng::seed_from_u64(32);
    let ens = generate_ensemble(20_000, 10, 1.0, 0.0, false, 1.0, &mut rng).unwrap();
    let w = importance_weights(&ens, 0.1, 1.0).unwrap();
    let (theo_l, theo_p) = theoretical_pmf(10, 1.0, 0.1, 1.0).unwrap();
    let (emp, reduced) = compare_histogram(&ens.lengths(), &theo_l, &theo_p, Some(&w), ens.len()).unwrap();

    let sum: f64 = emp.iter().sum();
    assert!((sum - 1.0).abs() < 1e-12);
    assert!(reduced < 3.0, "reduced = {reduced}");
}

#[test]
fn tail_probability_is_monotone() {
    let mut last = 1.0;
    for i in 1..40 {
        let q = chi_squared_sf(i as f64, 10);
        assert!(q <= last && q >= 0.0);
        last = q;
    }
}
