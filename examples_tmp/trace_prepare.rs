fn main() {
    // lonely case from test_prepare_rejects_degenerate_targets
    let lonely = "f,label\n1,a\n2,a\n3,b\n";
    println!("lonely: {:?}", qml_bench::dataset::prepare(lonely.as_bytes(), None, 7).map(|_| ()));
    // missing-features case
    let csv = "f1,f2,label\n1,2,a\n3,,b\n5,6,a\n7,8,b\n9,10,a\n11,12,b\n";
    println!("missing: {:?}", qml_bench::dataset::prepare(csv.as_bytes(), None, 7).map(|p| (p.summary.n_samples, p.notes)));
}
