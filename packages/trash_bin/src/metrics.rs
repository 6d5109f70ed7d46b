use nm::Event;

thread_local! {
    pub(crate) static TRASHES_CREATED: Event = Event::builder()
        .name("trash_bin_trashes_created")
        .build();

    pub(crate) static TAKE_OUTS: Event = Event::builder()
        .name("trash_bin_take_outs")
        .build();

    pub(crate) static TAKE_INS: Event = Event::builder()
        .name("trash_bin_take_ins")
        .build();

    pub(crate) static REMOVALS: Event = Event::builder()
        .name("trash_bin_removals")
        .build();

    /// Observed once per bulk reclaim, with the number of reclaimed trashes as the magnitude.
    pub(crate) static RECLAIMED: Event = Event::builder()
        .name("trash_bin_reclaimed")
        .build();
}
