use dsfetch::dsfetch_main;

fn main() -> dsfetch::SnafuReport<dsfetch::Error> {
    dsfetch_main()
}
